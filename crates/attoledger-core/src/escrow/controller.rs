use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument, warn};

use super::address::{compute_order_address, OrderParams};
use super::distribution::{check_conservation, distribute, Distribution};
use crate::access::MultiOwnable;
use crate::decimal::{assert_percent, Ratio};
use crate::events::{Event, EventSink};
use crate::token::TransferBatch;
use crate::{Address, Amount, Env, LedgerError, Result};

/// Escrow controller state machine.
///
/// Collected fees accumulate at the controller's own `address` on the token
/// ledger.
#[derive(Clone, Debug)]
pub struct Controller {
    address: Address,
    owners: MultiOwnable,
    fee_token: Address,
    payment_token: Address,
    fee: Ratio,

    created: BTreeSet<Address>,
    locked: BTreeSet<Address>,
    shipper_distribution: BTreeMap<Address, Ratio>,
}

impl Controller {
    pub fn new(
        address: Address,
        owners: &[Address],
        fee_token: Address,
        payment_token: Address,
        fee: Ratio,
    ) -> Result<Self> {
        if address.is_zero() {
            return Err(LedgerError::ZeroAddress("Controller"));
        }
        if fee_token.is_zero() {
            return Err(LedgerError::ZeroAddress("Fee token"));
        }
        if payment_token.is_zero() {
            return Err(LedgerError::ZeroAddress("Payment token"));
        }
        // Settlement sweeps the two balances separately.
        if fee_token == payment_token {
            return Err(LedgerError::IdenticalTokens);
        }
        assert_percent(fee)?;
        Ok(Self {
            address,
            owners: MultiOwnable::new(owners)?,
            fee_token,
            payment_token,
            fee,
            created: BTreeSet::new(),
            locked: BTreeSet::new(),
            shipper_distribution: BTreeMap::new(),
        })
    }

    // =========================================================================
    // Views
    // =========================================================================

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owners(&self) -> &[Address] {
        self.owners.owners()
    }

    pub fn owners_count(&self) -> usize {
        self.owners.owners_count()
    }

    pub fn fee(&self) -> Ratio {
        self.fee
    }

    pub fn fee_token(&self) -> Address {
        self.fee_token
    }

    pub fn payment_token(&self) -> Address {
        self.payment_token
    }

    pub fn fee_token_balance(&self, ledger: &dyn crate::TokenLedger) -> Amount {
        ledger.balance_of(self.fee_token, self.address)
    }

    pub fn payment_token_balance(&self, ledger: &dyn crate::TokenLedger) -> Amount {
        ledger.balance_of(self.payment_token, self.address)
    }

    pub fn locked(&self, order: &Address) -> bool {
        self.locked.contains(order)
    }

    pub fn is_created(&self, order: &Address) -> bool {
        self.created.contains(order)
    }

    /// Penalty recorded when the order was unlocked; zero otherwise.
    pub fn shipper_distribution(&self, order: &Address) -> Ratio {
        self.shipper_distribution
            .get(order)
            .copied()
            .unwrap_or(Ratio::ZERO)
    }

    pub fn compute_order_address(&self, params: &OrderParams) -> Address {
        compute_order_address(&self.address, params)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Creates the order at its derived address and distributes its balance
    /// with no shipper penalty.
    #[instrument(skip(self, env, params), fields(controller = %self.address, id = params.id))]
    pub fn create_order(&mut self, env: &mut Env<'_>, caller: Address, params: &OrderParams) -> Result<Address> {
        self.owners.require_owner(&caller)?;
        let order = self.compute_order_address(params);
        self.check_creatable(&order, params)?;
        if self.locked.contains(&order) {
            return Err(LedgerError::OrderLocked);
        }

        let dist = self.settle(env, &order, params, None)?;

        // Commit.
        self.created.insert(order);
        emit_order_created(env.events, self.address, params, order);
        debug!(order = %order, controller_share = dist.controller, carrier_share = dist.carrier, "Order created");
        Ok(order)
    }

    /// Marks an order so it cannot be created. Locking twice is a no-op.
    pub fn lock(&mut self, events: &mut dyn EventSink, caller: Address, order: Address) -> Result<()> {
        self.owners.require_owner(&caller)?;
        if order.is_zero() {
            return Err(LedgerError::ZeroAddress("Order"));
        }
        if !self.locked.insert(order) {
            return Ok(());
        }
        events.emit(self.address, Event::OrderLocked { order });
        Ok(())
    }

    /// Unlocks a locked order, records `penalty` as the shipper's share of
    /// the post-fee payment, and creates the order with that split.
    #[instrument(skip(self, env, params), fields(controller = %self.address, id = params.id))]
    pub fn unlock(
        &mut self,
        env: &mut Env<'_>,
        caller: Address,
        order: Address,
        penalty: Ratio,
        params: &OrderParams,
    ) -> Result<()> {
        self.owners.require_owner(&caller)?;
        if order.is_zero() {
            return Err(LedgerError::ZeroAddress("Order"));
        }
        assert_percent(penalty)?;
        if !self.locked.contains(&order) {
            return Err(LedgerError::NotLocked);
        }
        if self.compute_order_address(params) != order {
            warn!(order = %order, "Order parameters do not match address");
            return Err(LedgerError::AddressMismatch);
        }
        self.check_creatable(&order, params)?;

        let dist = self.settle(env, &order, params, Some(penalty))?;

        // Commit.
        self.locked.remove(&order);
        self.shipper_distribution.insert(order, penalty);
        self.created.insert(order);
        env.events
            .emit(self.address, Event::OrderUnlocked { order, penalty });
        emit_order_created(env.events, self.address, params, order);
        debug!(order = %order, shipper_share = dist.shipper, carrier_share = dist.carrier, "Order unlocked");
        Ok(())
    }

    fn check_creatable(&self, order: &Address, params: &OrderParams) -> Result<()> {
        if self.created.contains(order) {
            return Err(LedgerError::AlreadyCreated);
        }
        if params.shipper.is_zero() {
            return Err(LedgerError::ZeroAddress("Shipper"));
        }
        if params.carrier.is_zero() {
            return Err(LedgerError::ZeroAddress("Carrier"));
        }
        assert_percent(params.fee)
    }

    /// Moves everything held at `order` to its recipients as one unit.
    fn settle(
        &self,
        env: &mut Env<'_>,
        order: &Address,
        params: &OrderParams,
        penalty: Option<Ratio>,
    ) -> Result<Distribution> {
        let payment = env.ledger.balance_of(self.payment_token, *order);
        let swept_fees = env.ledger.balance_of(self.fee_token, *order);
        let dist = distribute(payment, params.fee, penalty)?;
        check_conservation(payment, &dist)?;

        let mut batch = TransferBatch::new(&mut *env.ledger);
        batch.transfer(self.payment_token, *order, self.address, dist.controller)?;
        batch.transfer(self.payment_token, *order, params.shipper, dist.shipper)?;
        batch.transfer(self.payment_token, *order, params.carrier, dist.carrier)?;
        batch.transfer(self.fee_token, *order, self.address, swept_fees)?;
        batch.commit();
        Ok(dist)
    }

    // =========================================================================
    // Fees
    // =========================================================================

    pub fn update_fee(&mut self, events: &mut dyn EventSink, caller: Address, fee: Ratio) -> Result<()> {
        self.owners.require_owner(&caller)?;
        assert_percent(fee)?;
        self.fee = fee;
        events.emit(self.address, Event::FeeUpdated { fee });
        Ok(())
    }

    pub fn withdraw_fee_token_fees(&mut self, env: &mut Env<'_>, caller: Address, to: Address, amount: Amount) -> Result<()> {
        self.withdraw_fees(env, self.fee_token, caller, to, amount)
    }

    pub fn withdraw_payment_token_fees(
        &mut self,
        env: &mut Env<'_>,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        self.withdraw_fees(env, self.payment_token, caller, to, amount)
    }

    #[instrument(skip(self, env), fields(controller = %self.address))]
    fn withdraw_fees(
        &mut self,
        env: &mut Env<'_>,
        token: Address,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        self.owners.require_owner(&caller)?;
        if amount == 0 {
            return Err(LedgerError::AmountNotPositive);
        }
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress("To"));
        }
        if env.ledger.balance_of(token, self.address) < amount {
            return Err(LedgerError::InsufficientFees);
        }
        env.ledger.transfer(token, self.address, to, amount)?;
        env.events.emit(
            self.address,
            Event::FeeWithdrawed {
                token,
                owner: caller,
                to,
                amount,
            },
        );
        debug!("Fees withdrawn");
        Ok(())
    }

    // =========================================================================
    // Owners
    // =========================================================================

    pub fn add_owners(&mut self, events: &mut dyn EventSink, caller: Address, owners: &[Address]) -> Result<()> {
        for new_owner in self.owners.add_owners(&caller, owners)? {
            events.emit(self.address, Event::OwnerAdded { new_owner });
        }
        Ok(())
    }

    pub fn remove_owners(&mut self, events: &mut dyn EventSink, caller: Address, owners: &[Address]) -> Result<()> {
        for previous_owner in self.owners.remove_owners(&caller, owners)? {
            events.emit(self.address, Event::OwnerRemoved { previous_owner });
        }
        Ok(())
    }
}

fn emit_order_created(events: &mut dyn EventSink, source: Address, params: &OrderParams, order: Address) {
    events.emit(
        source,
        Event::OrderCreated {
            id: params.id,
            shipper: params.shipper,
            carrier: params.carrier,
            order,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;
    use crate::token::{InMemoryTokenLedger, TokenLedger};
    use crate::Hash32;

    fn addr(b: u8) -> Address {
        Address([b; 20])
    }

    fn owner() -> Address {
        addr(1)
    }

    const FEE_TOKEN: Address = Address([0xF0; 20]);
    const PAY_TOKEN: Address = Address([0xF1; 20]);

    fn pct(points: u64) -> Ratio {
        Ratio::from_percent_points(points).unwrap()
    }

    fn params(id: u128) -> OrderParams {
        OrderParams {
            salt: Hash32([9u8; 32]),
            id,
            shipper: addr(0x51),
            carrier: addr(0xCA),
            fee: pct(20),
        }
    }

    fn setup() -> (Controller, InMemoryTokenLedger, EventLog) {
        let controller = Controller::new(addr(0xC0), &[owner()], FEE_TOKEN, PAY_TOKEN, pct(10)).unwrap();
        (controller, InMemoryTokenLedger::new(), EventLog::new())
    }

    #[test]
    fn constructor_validates() {
        assert_eq!(
            Controller::new(addr(0xC0), &[], FEE_TOKEN, PAY_TOKEN, pct(10)).err(),
            Some(LedgerError::OwnersRequired)
        );
        assert_eq!(
            Controller::new(addr(0xC0), &[owner()], FEE_TOKEN, PAY_TOKEN, pct(101)).err(),
            Some(LedgerError::InvalidPercent)
        );
    }

    #[test]
    fn constructor_rejects_shared_fee_and_payment_token() {
        assert_eq!(
            Controller::new(addr(0xC0), &[owner()], PAY_TOKEN, PAY_TOKEN, pct(10)).err(),
            Some(LedgerError::IdenticalTokens)
        );
        assert_eq!(
            LedgerError::IdenticalTokens.category(),
            crate::ErrorCategory::Validation
        );
    }

    #[test]
    fn create_order_uses_order_fee_not_controller_fee() {
        let (mut c, mut ledger, mut events) = setup();
        let p = params(1);
        let order = c.compute_order_address(&p);
        ledger.mint(PAY_TOKEN, order, 1000).unwrap();
        ledger.mint(FEE_TOKEN, order, 55).unwrap();

        let mut env = Env::new(&mut ledger, &mut events);
        let created = c.create_order(&mut env, owner(), &p).unwrap();
        assert_eq!(created, order);

        assert_eq!(c.payment_token_balance(&ledger), 200);
        assert_eq!(c.fee_token_balance(&ledger), 55);
        assert_eq!(ledger.balance_of(PAY_TOKEN, p.carrier), 800);
        assert_eq!(ledger.balance_of(PAY_TOKEN, p.shipper), 0);
        assert_eq!(ledger.balance_of(PAY_TOKEN, order), 0);
        assert_eq!(
            events.last(),
            Some(&Event::OrderCreated {
                id: 1,
                shipper: p.shipper,
                carrier: p.carrier,
                order
            })
        );
    }

    #[test]
    fn create_order_rejections() {
        let (mut c, mut ledger, mut events) = setup();
        let mut env = Env::new(&mut ledger, &mut events);
        let p = params(2);
        assert_eq!(
            c.create_order(&mut env, addr(7), &p),
            Err(LedgerError::NotOwner)
        );
        c.create_order(&mut env, owner(), &p).unwrap();
        assert_eq!(
            c.create_order(&mut env, owner(), &p),
            Err(LedgerError::AlreadyCreated)
        );

        let p3 = params(3);
        let order3 = c.compute_order_address(&p3);
        c.lock(env.events, owner(), order3).unwrap();
        assert_eq!(
            c.create_order(&mut env, owner(), &p3),
            Err(LedgerError::OrderLocked)
        );
    }

    #[test]
    fn lock_is_idempotent() {
        let (mut c, _ledger, mut events) = setup();
        let order = addr(0x0D);
        assert_eq!(
            c.lock(&mut events, owner(), Address::ZERO),
            Err(LedgerError::ZeroAddress("Order"))
        );
        c.lock(&mut events, owner(), order).unwrap();
        c.lock(&mut events, owner(), order).unwrap();
        assert!(c.locked(&order));
        assert_eq!(events.len(), 1);
        assert_eq!(events.last(), Some(&Event::OrderLocked { order }));
    }

    #[test]
    fn unlock_applies_penalty() {
        let (mut c, mut ledger, mut events) = setup();
        let p = params(4);
        let order = c.compute_order_address(&p);
        ledger.mint(PAY_TOKEN, order, 1000).unwrap();
        c.lock(&mut events, owner(), order).unwrap();

        let mut env = Env::new(&mut ledger, &mut events);
        c.unlock(&mut env, owner(), order, pct(50), &p).unwrap();

        assert!(!c.locked(&order));
        assert!(c.is_created(&order));
        assert_eq!(c.shipper_distribution(&order), pct(50));
        assert_eq!(c.payment_token_balance(&ledger), 200);
        assert_eq!(ledger.balance_of(PAY_TOKEN, p.shipper), 400);
        assert_eq!(ledger.balance_of(PAY_TOKEN, p.carrier), 400);

        let names: Vec<_> = events.events().map(Event::name).collect();
        assert_eq!(names, vec!["OrderLocked", "OrderUnlocked", "OrderCreated"]);
    }

    #[test]
    fn unlock_rejections_in_order() {
        let (mut c, mut ledger, mut events) = setup();
        let p = params(5);
        let order = c.compute_order_address(&p);
        let mut env = Env::new(&mut ledger, &mut events);

        assert_eq!(
            c.unlock(&mut env, addr(7), order, pct(50), &p),
            Err(LedgerError::NotOwner)
        );
        assert_eq!(
            c.unlock(&mut env, owner(), Address::ZERO, pct(50), &p),
            Err(LedgerError::ZeroAddress("Order"))
        );
        assert_eq!(
            c.unlock(&mut env, owner(), order, pct(101), &p),
            Err(LedgerError::InvalidPercent)
        );
        assert_eq!(
            c.unlock(&mut env, owner(), order, pct(50), &p),
            Err(LedgerError::NotLocked)
        );
        c.lock(env.events, owner(), order).unwrap();
        assert_eq!(
            c.unlock(&mut env, owner(), order, pct(50), &params(6)),
            Err(LedgerError::AddressMismatch)
        );
        assert!(c.locked(&order));
    }

    #[test]
    fn fee_withdrawals() {
        let (mut c, mut ledger, mut events) = setup();
        ledger.mint(PAY_TOKEN, c.address(), 100).unwrap();
        let mut env = Env::new(&mut ledger, &mut events);

        assert_eq!(
            c.withdraw_payment_token_fees(&mut env, addr(7), addr(8), 1),
            Err(LedgerError::NotOwner)
        );
        assert_eq!(
            c.withdraw_payment_token_fees(&mut env, owner(), addr(8), 0),
            Err(LedgerError::AmountNotPositive)
        );
        assert_eq!(
            c.withdraw_payment_token_fees(&mut env, owner(), Address::ZERO, 1),
            Err(LedgerError::ZeroAddress("To"))
        );
        assert_eq!(
            c.withdraw_payment_token_fees(&mut env, owner(), addr(8), 101),
            Err(LedgerError::InsufficientFees)
        );
        assert_eq!(
            c.withdraw_fee_token_fees(&mut env, owner(), addr(8), 1),
            Err(LedgerError::InsufficientFees)
        );
        c.withdraw_payment_token_fees(&mut env, owner(), addr(8), 60)
            .unwrap();
        assert_eq!(
            events.last(),
            Some(&Event::FeeWithdrawed {
                token: PAY_TOKEN,
                owner: owner(),
                to: addr(8),
                amount: 60
            })
        );
        assert_eq!(ledger.balance_of(PAY_TOKEN, addr(8)), 60);
    }

    #[test]
    fn update_fee_validates_percent() {
        let (mut c, _ledger, mut events) = setup();
        assert_eq!(
            c.update_fee(&mut events, owner(), pct(101)),
            Err(LedgerError::InvalidPercent)
        );
        c.update_fee(&mut events, owner(), pct(30)).unwrap();
        assert_eq!(c.fee(), pct(30));
        assert_eq!(events.last(), Some(&Event::FeeUpdated { fee: pct(30) }));
    }

    #[test]
    fn owner_changes_emit_only_real_changes() {
        let (mut c, _ledger, mut events) = setup();
        c.add_owners(&mut events, owner(), &[]).unwrap();
        c.remove_owners(&mut events, owner(), &[]).unwrap();
        assert!(events.is_empty());

        c.add_owners(&mut events, owner(), &[addr(2), owner(), addr(2)])
            .unwrap();
        assert_eq!(c.owners(), &[owner(), addr(2)]);
        assert_eq!(events.len(), 1);

        assert_eq!(
            c.remove_owners(&mut events, owner(), &[owner(), addr(2)]),
            Err(LedgerError::MustHaveOneOwner)
        );
        c.remove_owners(&mut events, addr(2), &[owner(), addr(9)])
            .unwrap();
        assert_eq!(c.owners(), &[addr(2)]);
        assert_eq!(
            events.last(),
            Some(&Event::OwnerRemoved {
                previous_owner: owner()
            })
        );
    }
}
