//! End-to-end distributor behaviour through the ledger host.

use dispas_core::{Address, Amount, Asset, Payment, PaymentBatch};
use dispas_ledger::{FundsDistributed, LedgerError, LedgerEvent, LedgerService, TokensDistributed};

fn addr(n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0xaa;
    bytes[19] = n;
    Address::from_bytes(bytes)
}

fn ether(s: &str) -> Amount {
    Amount::parse(s, 18).unwrap()
}

struct Accounts {
    deployer: Address,
    addr1: Address,
    addr2: Address,
    addr3: Address,
}

fn accounts() -> Accounts {
    Accounts {
        deployer: addr(0),
        addr1: addr(1),
        addr2: addr(2),
        addr3: addr(3),
    }
}

fn deployed() -> LedgerService {
    let mut service = LedgerService::new(addr(0xd1));
    let a = accounts();
    service.mint(Asset::Native, a.deployer, ether("10000")).unwrap();
    service
}

fn summaries(service: &LedgerService) -> Vec<LedgerEvent> {
    service
        .logs()
        .iter()
        .map(|e| e.payload().clone())
        .filter(LedgerEvent::is_distribution)
        .collect()
}

#[test]
fn distributes_funds_to_multiple_recipients() {
    let mut service = deployed();
    let a = accounts();
    let (amount1, amount2, amount3) = (ether("1"), ether("0.5"), ether("0.25"));

    let before: Vec<Amount> = [a.addr1, a.addr2, a.addr3]
        .iter()
        .map(|r| service.balance_of(*r))
        .collect();

    let payments = PaymentBatch::new(vec![
        Payment::new(a.addr1, amount1),
        Payment::new(a.addr2, amount2),
        Payment::new(a.addr3, amount3),
    ]);
    let receipt = service
        .distribute_funds(a.deployer, payments, ether("1.75"))
        .unwrap();

    assert_eq!(
        receipt.distribution(),
        Some(&LedgerEvent::FundsDistributed(FundsDistributed {
            sender: a.deployer,
            total: ether("1.75"),
        }))
    );
    assert_eq!(summaries(&service).len(), 1);

    assert_eq!(service.balance_of(a.addr1), before[0].checked_add(amount1).unwrap());
    assert_eq!(service.balance_of(a.addr2), before[1].checked_add(amount2).unwrap());
    assert_eq!(service.balance_of(a.addr3), before[2].checked_add(amount3).unwrap());
    assert_eq!(service.balance_of(service.distributor()), Amount::ZERO);
}

#[test]
fn reverts_on_zero_recipient() {
    let mut service = deployed();
    let a = accounts();
    let err = service
        .distribute_funds(
            a.deployer,
            PaymentBatch::new(vec![Payment::new(Address::ZERO, ether("1"))]),
            ether("1"),
        )
        .unwrap_err();
    assert_eq!(err.code(), "ZeroAddress");
    assert_eq!(service.balance_of(a.deployer), ether("10000"));
}

#[test]
fn reverts_on_zero_amount() {
    let mut service = deployed();
    let a = accounts();
    let err = service
        .distribute_funds(
            a.deployer,
            PaymentBatch::new(vec![Payment::new(a.addr1, Amount::ZERO)]),
            Amount::ZERO,
        )
        .unwrap_err();
    assert_eq!(err.code(), "ZeroAmount");
}

#[test]
fn reverts_when_value_does_not_match_total() {
    let mut service = deployed();
    let a = accounts();
    let payments = PaymentBatch::new(vec![
        Payment::new(a.addr1, ether("1")),
        Payment::new(a.addr2, ether("1")),
    ]);
    let err = service
        .distribute_funds(a.deployer, payments, ether("1.5"))
        .unwrap_err();
    assert_eq!(
        err,
        LedgerError::InsufficientValue {
            sent: ether("1.5"),
            required: ether("2"),
        }
    );
    assert_eq!(service.balance_of(a.addr1), Amount::ZERO);
    assert_eq!(service.balance_of(a.addr2), Amount::ZERO);
}

#[test]
fn rejects_direct_value_transfers_to_the_distributor() {
    let mut service = deployed();
    let a = accounts();
    let distributor = service.distributor();
    let err = service
        .transfer(Asset::Native, a.deployer, distributor, ether("1"))
        .unwrap_err();
    assert_eq!(err, LedgerError::DirectTransferRejected);
    assert_eq!(service.balance_of(distributor), Amount::ZERO);
}

#[test]
fn reverts_when_a_payment_targets_the_distributor() {
    let mut service = deployed();
    let a = accounts();
    let distributor = service.distributor();
    let logged = service.logs().len();

    let err = service
        .distribute_funds(
            a.deployer,
            PaymentBatch::new(vec![
                Payment::new(a.addr1, ether("10")),
                Payment::new(distributor, ether("40")),
            ]),
            ether("50"),
        )
        .unwrap_err();

    assert_eq!(err, LedgerError::DirectTransferRejected);
    assert_eq!(service.balance_of(distributor), Amount::ZERO);
    assert_eq!(service.balance_of(a.addr1), Amount::ZERO);
    assert_eq!(service.balance_of(a.deployer), ether("10000"));
    assert_eq!(service.logs().len(), logged);
}

mod tokens {
    use super::*;

    const TOKEN: u8 = 0x70;

    fn with_token() -> LedgerService {
        let mut service = deployed();
        let a = accounts();
        service
            .deploy_token(addr(TOKEN), "Test Token", "TEST", 18)
            .unwrap();
        service
            .mint(Asset::Token(addr(TOKEN)), a.deployer, ether("1000"))
            .unwrap();
        service
    }

    #[test]
    fn distributes_tokens_to_multiple_recipients() {
        let mut service = with_token();
        let a = accounts();
        let token = addr(TOKEN);

        service.approve(token, a.deployer, ether("175")).unwrap();
        let payments = PaymentBatch::new(vec![
            Payment::new(a.addr1, ether("100")),
            Payment::new(a.addr2, ether("50")),
            Payment::new(a.addr3, ether("25")),
        ]);
        let receipt = service
            .distribute_tokens(a.deployer, token, payments)
            .unwrap();

        assert_eq!(
            receipt.distribution(),
            Some(&LedgerEvent::TokensDistributed(TokensDistributed {
                sender: a.deployer,
                token,
                total: ether("175"),
            }))
        );
        assert_eq!(service.token_balance_of(token, a.addr1), ether("100"));
        assert_eq!(service.token_balance_of(token, a.addr2), ether("50"));
        assert_eq!(service.token_balance_of(token, a.addr3), ether("25"));
        assert_eq!(service.token_balance_of(token, a.deployer), ether("825"));
        assert_eq!(
            service.allowance(token, a.deployer, service.distributor()),
            Amount::ZERO
        );
    }

    #[test]
    fn reverts_on_zero_recipient() {
        let mut service = with_token();
        let a = accounts();
        service.approve(addr(TOKEN), a.deployer, ether("100")).unwrap();
        let err = service
            .distribute_tokens(
                a.deployer,
                addr(TOKEN),
                PaymentBatch::new(vec![Payment::new(Address::ZERO, ether("100"))]),
            )
            .unwrap_err();
        assert_eq!(err.code(), "ZeroAddress");
    }

    #[test]
    fn reverts_on_zero_amount() {
        let mut service = with_token();
        let a = accounts();
        let err = service
            .distribute_tokens(
                a.deployer,
                addr(TOKEN),
                PaymentBatch::new(vec![Payment::new(a.addr1, Amount::ZERO)]),
            )
            .unwrap_err();
        assert_eq!(err.code(), "ZeroAmount");
    }

    #[test]
    fn reverts_when_a_payment_targets_the_distributor() {
        let mut service = with_token();
        let a = accounts();
        let token = addr(TOKEN);
        let distributor = service.distributor();
        service.approve(token, a.deployer, ether("50")).unwrap();

        let err = service
            .distribute_tokens(
                a.deployer,
                token,
                PaymentBatch::new(vec![
                    Payment::new(a.addr1, ether("10")),
                    Payment::new(distributor, ether("40")),
                ]),
            )
            .unwrap_err();

        assert_eq!(err, LedgerError::DirectTransferRejected);
        assert_eq!(service.token_balance_of(token, distributor), Amount::ZERO);
        assert_eq!(service.token_balance_of(token, a.deployer), ether("1000"));
        assert_eq!(service.allowance(token, a.deployer, distributor), ether("50"));
    }

    #[test]
    fn reverts_on_insufficient_allowance() {
        let mut service = with_token();
        let a = accounts();
        service.approve(addr(TOKEN), a.deployer, ether("100")).unwrap();
        let err = service
            .distribute_tokens(
                a.deployer,
                addr(TOKEN),
                PaymentBatch::new(vec![
                    Payment::new(a.addr1, ether("100")),
                    Payment::new(a.addr2, ether("100")),
                ]),
            )
            .unwrap_err();
        assert_eq!(err.code(), "InsufficientAllowance");
        assert_eq!(service.token_balance_of(addr(TOKEN), a.deployer), ether("1000"));
        assert_eq!(
            service.allowance(addr(TOKEN), a.deployer, service.distributor()),
            ether("100")
        );
    }
}
