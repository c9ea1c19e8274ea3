use tokio::sync::Mutex;
use tracing::info;

use common::Account;

/// Single-writer wrapper around the session account.
///
/// The balance is the one resource shared across all concurrently settling
/// executions; every change goes through `credit` under one mutex, so
/// concurrent settlements accumulate without lost updates. Only the
/// settlement path calls `credit`.
pub struct AccountLedger {
    account: Mutex<Account>,
}

impl AccountLedger {
    pub fn new(account: Account) -> Self {
        info!(
            account = %account.account_id,
            balance = account.balance,
            currency = %account.currency,
            "AccountLedger initialized"
        );
        Self {
            account: Mutex::new(account),
        }
    }

    /// Apply one settlement's profit. Returns the new balance.
    pub async fn credit(&self, profit: f64) -> f64 {
        let mut account = self.account.lock().await;
        account.balance += profit;
        account.balance
    }

    pub async fn balance(&self) -> f64 {
        self.account.lock().await.balance
    }

    pub async fn snapshot(&self) -> Account {
        self.account.lock().await.clone()
    }

    pub async fn set_connected(&self, connected: bool) {
        self.account.lock().await.connected = connected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn account(balance: f64) -> Account {
        Account {
            account_id: "VRTC12345".into(),
            balance,
            currency: "USD".into(),
            connected: true,
        }
    }

    #[tokio::test]
    async fn credit_moves_the_balance() {
        let ledger = AccountLedger::new(account(10_000.0));
        let balance = ledger.credit(8.0).await;
        assert!((balance - 10_008.0).abs() < 1e-9);
        let balance = ledger.credit(-10.0).await;
        assert!((balance - 9_998.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn concurrent_settlements_accumulate_commutatively() {
        let profits: Vec<f64> = vec![8.0, -10.0, 4.5, -2.0, 16.0, -10.0, 8.0, 3.25];
        let expected: f64 = 10_000.0 + profits.iter().sum::<f64>();

        // Apply in several arrival orders, concurrently each time.
        for rotation in 0..profits.len() {
            let ledger = Arc::new(AccountLedger::new(account(10_000.0)));
            let mut handles = Vec::new();
            for i in 0..profits.len() {
                let profit = profits[(i + rotation) % profits.len()];
                let ledger = ledger.clone();
                handles.push(tokio::spawn(async move { ledger.credit(profit).await }));
            }
            for h in handles {
                h.await.unwrap();
            }
            let balance = ledger.balance().await;
            assert!(
                (balance - expected).abs() < 1e-9,
                "rotation {rotation}: got {balance}, expected {expected}"
            );
        }
    }
}
