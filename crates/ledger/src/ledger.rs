use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use dispas_core::{Address, Aggregate, AggregateRoot, Amount, Asset, PaymentBatch};
use dispas_events::Event;

use crate::balances::{self, BalanceSheet, Balances};
use crate::error::LedgerError;
use crate::token::TokenContract;

/// Aggregate root: the settlement ledger.
///
/// Holds native balances, hosted token contracts and the address of the batch
/// distributor. Every state change goes through `handle` + `apply`, so a
/// command commits all of its effects or none of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    distributor: Address,
    native: Balances,
    tokens: HashMap<Address, TokenContract>,
    version: u64,
}

impl Ledger {
    pub fn new(distributor: Address) -> Self {
        Self {
            distributor,
            native: Balances::new(),
            tokens: HashMap::new(),
            version: 0,
        }
    }

    /// Address the distributor operates from (allowance spender, value sink).
    pub fn distributor(&self) -> Address {
        self.distributor
    }

    pub fn balance_of(&self, account: Address) -> Amount {
        self.native.get(&account).copied().unwrap_or(Amount::ZERO)
    }

    pub fn token(&self, contract: Address) -> Option<&TokenContract> {
        self.tokens.get(&contract)
    }

    /// Token balance; zero for unknown contracts.
    pub fn token_balance_of(&self, contract: Address, owner: Address) -> Amount {
        self.token(contract)
            .map(|t| t.balance_of(owner))
            .unwrap_or(Amount::ZERO)
    }

    /// Remaining allowance; zero for unknown contracts.
    pub fn allowance(&self, contract: Address, owner: Address, spender: Address) -> Amount {
        self.token(contract)
            .map(|t| t.allowance(owner, spender))
            .unwrap_or(Amount::ZERO)
    }

    /// Balance of any asset.
    pub fn asset_balance_of(&self, asset: Asset, account: Address) -> Amount {
        match asset {
            Asset::Native => self.balance_of(account),
            Asset::Token(contract) => self.token_balance_of(contract, account),
        }
    }

    /// Sum of all native balances.
    pub fn native_supply(&self) -> Amount {
        self.native
            .values()
            .fold(Amount::ZERO, |acc, b| acc.saturating_add(*b))
    }

    pub(crate) fn known_token(&self, contract: Address) -> Result<&TokenContract, LedgerError> {
        self.token(contract).ok_or(LedgerError::UnknownToken(contract))
    }

    pub(crate) fn sheet(&self, asset: Asset) -> Result<BalanceSheet<'_>, LedgerError> {
        match asset {
            Asset::Native => Ok(BalanceSheet::new(&self.native)),
            Asset::Token(contract) => Ok(BalanceSheet::new(&self.known_token(contract)?.balances)),
        }
    }

    fn balances_mut(&mut self, asset: Asset) -> Option<&mut Balances> {
        match asset {
            Asset::Native => Some(&mut self.native),
            Asset::Token(contract) => self.tokens.get_mut(&contract).map(|t| &mut t.balances),
        }
    }
}

impl AggregateRoot for Ledger {
    type Id = Address;

    fn id(&self) -> &Self::Id {
        &self.distributor
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: Mint. Creates new units out of thin air (genesis funding).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mint {
    pub asset: Asset,
    pub to: Address,
    pub amount: Amount,
}

/// Command: DeployToken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployToken {
    pub contract: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Command: Approve. Sets (not adds to) the spender's allowance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approve {
    pub token: Address,
    pub owner: Address,
    pub spender: Address,
    pub amount: Amount,
}

/// Command: Transfer. A plain single-recipient value transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub asset: Asset,
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

/// Command: DistributeFunds. `value` is the native amount sent with the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributeFunds {
    pub sender: Address,
    pub payments: PaymentBatch,
    pub value: Amount,
}

/// Command: DistributeTokens. Funded by the sender's allowance to the distributor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributeTokens {
    pub sender: Address,
    pub token: Address,
    pub payments: PaymentBatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCommand {
    Mint(Mint),
    DeployToken(DeployToken),
    Approve(Approve),
    Transfer(Transfer),
    DistributeFunds(DistributeFunds),
    DistributeTokens(DistributeTokens),
}

impl LedgerCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerCommand::Mint(_) => "mint",
            LedgerCommand::DeployToken(_) => "deploy_token",
            LedgerCommand::Approve(_) => "approve",
            LedgerCommand::Transfer(_) => "transfer",
            LedgerCommand::DistributeFunds(_) => "distribute_funds",
            LedgerCommand::DistributeTokens(_) => "distribute_tokens",
        }
    }
}

/// Event: TokenDeployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDeployed {
    pub contract: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Event: Minted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Minted {
    pub asset: Asset,
    pub to: Address,
    pub amount: Amount,
}

/// Event: Approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approved {
    pub token: Address,
    pub owner: Address,
    pub spender: Address,
    pub amount: Amount,
}

/// Event: AllowanceSpent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceSpent {
    pub token: Address,
    pub owner: Address,
    pub spender: Address,
    pub amount: Amount,
}

/// Event: Transferred. One balance movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transferred {
    pub asset: Asset,
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

/// Event: FundsDistributed. The distributor's one summary per native batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsDistributed {
    pub sender: Address,
    pub total: Amount,
}

/// Event: TokensDistributed. The distributor's one summary per token batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensDistributed {
    pub sender: Address,
    pub token: Address,
    pub total: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    TokenDeployed(TokenDeployed),
    Minted(Minted),
    Approved(Approved),
    AllowanceSpent(AllowanceSpent),
    Transferred(Transferred),
    FundsDistributed(FundsDistributed),
    TokensDistributed(TokensDistributed),
}

impl LedgerEvent {
    /// Account that emits this event into the log.
    ///
    /// Token events come from their contract, distributor summaries from the
    /// distributor. Native balance movements are recorded by the host itself,
    /// which is represented by the zero address.
    pub fn emitter(&self, distributor: Address) -> Address {
        let by_asset = |asset: &Asset| match asset {
            Asset::Native => Address::ZERO,
            Asset::Token(contract) => *contract,
        };
        match self {
            LedgerEvent::TokenDeployed(e) => e.contract,
            LedgerEvent::Minted(e) => by_asset(&e.asset),
            LedgerEvent::Approved(e) => e.token,
            LedgerEvent::AllowanceSpent(e) => e.token,
            LedgerEvent::Transferred(e) => by_asset(&e.asset),
            LedgerEvent::FundsDistributed(_) | LedgerEvent::TokensDistributed(_) => distributor,
        }
    }

    /// Whether this is one of the distributor's batch summaries.
    pub fn is_distribution(&self) -> bool {
        matches!(
            self,
            LedgerEvent::FundsDistributed(_) | LedgerEvent::TokensDistributed(_)
        )
    }
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::TokenDeployed(_) => "ledger.token_deployed",
            LedgerEvent::Minted(_) => "ledger.minted",
            LedgerEvent::Approved(_) => "token.approved",
            LedgerEvent::AllowanceSpent(_) => "token.allowance_spent",
            LedgerEvent::Transferred(_) => "ledger.transferred",
            LedgerEvent::FundsDistributed(_) => "dispas.funds_distributed",
            LedgerEvent::TokensDistributed(_) => "dispas.tokens_distributed",
        }
    }

    fn version(&self) -> u32 {
        1
    }
}

impl Aggregate for Ledger {
    type Command = LedgerCommand;
    type Event = LedgerEvent;
    type Error = LedgerError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LedgerEvent::TokenDeployed(e) => {
                self.tokens.insert(
                    e.contract,
                    TokenContract::new(e.name.clone(), e.symbol.clone(), e.decimals),
                );
            }
            LedgerEvent::Minted(e) => {
                if let Some(b) = self.balances_mut(e.asset) {
                    balances::credit(b, e.to, e.amount);
                }
            }
            LedgerEvent::Approved(e) => {
                if let Some(t) = self.tokens.get_mut(&e.token) {
                    t.set_allowance(e.owner, e.spender, e.amount);
                }
            }
            LedgerEvent::AllowanceSpent(e) => {
                if let Some(t) = self.tokens.get_mut(&e.token) {
                    t.spend_allowance(e.owner, e.spender, e.amount);
                }
            }
            LedgerEvent::Transferred(e) => {
                if let Some(b) = self.balances_mut(e.asset) {
                    balances::debit(b, e.from, e.amount);
                    balances::credit(b, e.to, e.amount);
                }
            }
            LedgerEvent::FundsDistributed(_) | LedgerEvent::TokensDistributed(_) => {}
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LedgerCommand::Mint(cmd) => self.handle_mint(cmd),
            LedgerCommand::DeployToken(cmd) => self.handle_deploy(cmd),
            LedgerCommand::Approve(cmd) => self.handle_approve(cmd),
            LedgerCommand::Transfer(cmd) => self.handle_transfer(cmd),
            LedgerCommand::DistributeFunds(cmd) => self.handle_distribute_funds(cmd),
            LedgerCommand::DistributeTokens(cmd) => self.handle_distribute_tokens(cmd),
        }
    }
}

impl Ledger {
    fn handle_mint(&self, cmd: &Mint) -> Result<Vec<LedgerEvent>, LedgerError> {
        if cmd.to.is_zero() {
            return Err(LedgerError::ZeroAddress { index: 0 });
        }
        if cmd.amount.is_zero() {
            return Err(LedgerError::ZeroAmount { index: 0 });
        }

        let mut sheet = self.sheet(cmd.asset)?;
        sheet.credit(cmd.to, cmd.amount)?;

        Ok(vec![LedgerEvent::Minted(Minted {
            asset: cmd.asset,
            to: cmd.to,
            amount: cmd.amount,
        })])
    }

    fn handle_deploy(&self, cmd: &DeployToken) -> Result<Vec<LedgerEvent>, LedgerError> {
        if cmd.contract.is_zero() {
            return Err(LedgerError::ZeroAddress { index: 0 });
        }
        if self.tokens.contains_key(&cmd.contract) || cmd.contract == self.distributor {
            return Err(LedgerError::TokenAlreadyDeployed(cmd.contract));
        }

        Ok(vec![LedgerEvent::TokenDeployed(TokenDeployed {
            contract: cmd.contract,
            name: cmd.name.clone(),
            symbol: cmd.symbol.clone(),
            decimals: cmd.decimals,
        })])
    }

    fn handle_approve(&self, cmd: &Approve) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.known_token(cmd.token)?;
        if cmd.spender.is_zero() {
            return Err(LedgerError::ZeroAddress { index: 0 });
        }

        Ok(vec![LedgerEvent::Approved(Approved {
            token: cmd.token,
            owner: cmd.owner,
            spender: cmd.spender,
            amount: cmd.amount,
        })])
    }

    fn handle_transfer(&self, cmd: &Transfer) -> Result<Vec<LedgerEvent>, LedgerError> {
        if cmd.to == self.distributor {
            return Err(LedgerError::DirectTransferRejected);
        }
        if cmd.to.is_zero() {
            return Err(LedgerError::ZeroAddress { index: 0 });
        }
        if cmd.amount.is_zero() {
            return Err(LedgerError::ZeroAmount { index: 0 });
        }

        let mut sheet = self.sheet(cmd.asset)?;
        sheet.transfer(cmd.from, cmd.to, cmd.amount)?;

        Ok(vec![LedgerEvent::Transferred(Transferred {
            asset: cmd.asset,
            from: cmd.from,
            to: cmd.to,
            amount: cmd.amount,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispas_events::execute;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from_bytes(bytes)
    }

    fn units(n: u128) -> Amount {
        Amount::from_units(n)
    }

    fn distributor() -> Address {
        addr(0xd1)
    }

    fn funded(account: Address, amount: u128) -> Ledger {
        let mut ledger = Ledger::new(distributor());
        execute(
            &mut ledger,
            &LedgerCommand::Mint(Mint {
                asset: Asset::Native,
                to: account,
                amount: units(amount),
            }),
        )
        .unwrap();
        ledger
    }

    #[test]
    fn mint_credits_balance_and_bumps_version() {
        let ledger = funded(addr(1), 500);
        assert_eq!(ledger.balance_of(addr(1)), units(500));
        assert_eq!(ledger.version(), 1);
    }

    #[test]
    fn plain_transfer_moves_value() {
        let mut ledger = funded(addr(1), 500);
        let events = execute(
            &mut ledger,
            &LedgerCommand::Transfer(Transfer {
                asset: Asset::Native,
                from: addr(1),
                to: addr(2),
                amount: units(200),
            }),
        )
        .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(ledger.balance_of(addr(1)), units(300));
        assert_eq!(ledger.balance_of(addr(2)), units(200));
    }

    #[test]
    fn direct_transfer_to_distributor_is_rejected_without_effect() {
        let ledger = funded(addr(1), 500);
        let before = ledger.clone();

        let err = ledger
            .handle(&LedgerCommand::Transfer(Transfer {
                asset: Asset::Native,
                from: addr(1),
                to: distributor(),
                amount: units(100),
            }))
            .unwrap_err();

        assert_eq!(err, LedgerError::DirectTransferRejected);
        assert_eq!(ledger, before);
    }

    #[test]
    fn overdrawn_transfer_reverts() {
        let ledger = funded(addr(1), 5);
        let err = ledger
            .handle(&LedgerCommand::Transfer(Transfer {
                asset: Asset::Native,
                from: addr(1),
                to: addr(2),
                amount: units(6),
            }))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
    }

    #[test]
    fn approve_requires_deployed_token() {
        let ledger = Ledger::new(distributor());
        let err = ledger
            .handle(&LedgerCommand::Approve(Approve {
                token: addr(0x70),
                owner: addr(1),
                spender: distributor(),
                amount: units(1),
            }))
            .unwrap_err();
        assert_eq!(err, LedgerError::UnknownToken(addr(0x70)));
    }

    #[test]
    fn deploying_twice_conflicts() {
        let mut ledger = Ledger::new(distributor());
        let deploy = LedgerCommand::DeployToken(DeployToken {
            contract: addr(0x70),
            name: "Test Token".into(),
            symbol: "TEST".into(),
            decimals: 18,
        });
        execute(&mut ledger, &deploy).unwrap();
        assert_eq!(
            ledger.handle(&deploy).unwrap_err(),
            LedgerError::TokenAlreadyDeployed(addr(0x70))
        );
    }

    #[test]
    fn emitters_follow_the_asset() {
        let token = addr(0x70);
        let ev = LedgerEvent::Transferred(Transferred {
            asset: Asset::Token(token),
            from: addr(1),
            to: addr(2),
            amount: units(1),
        });
        assert_eq!(ev.emitter(distributor()), token);

        let summary = LedgerEvent::FundsDistributed(FundsDistributed {
            sender: addr(1),
            total: units(1),
        });
        assert_eq!(summary.emitter(distributor()), distributor());
        assert!(summary.is_distribution());
    }
}
