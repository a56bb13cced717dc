//! Pot settlement: computed once per room on its terminal transition.
//!
//! Transfers are best-effort. A failed outbound is logged and the room
//! stays finished; reconciliation is an operational concern, not a state
//! machine one.

use crate::payments::PaymentOracle;
use stakemate_types::Amount;
use tracing::warn;

/// House fee share of the pot, in percent.
const HOUSE_CUT_PCT: u128 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Payouts {
    pub pot: Amount,
    pub house_cut: Amount,
    pub payout: Amount,
}

/// `pot = 2·stake`, house keeps 10%, the winner takes the rest.
pub fn compute(stake: Amount) -> Payouts {
    let pot = stake.saturating_mul(2);
    let house_cut = (pot as u128 * HOUSE_CUT_PCT / 100) as Amount;
    Payouts {
        pot,
        house_cut,
        payout: pot - house_cut,
    }
}

/// What the terminal transition decided, captured under the room lock and
/// executed outside it.
#[derive(Clone, Debug)]
pub enum SettlementPlan {
    /// Pay the winner, fee to the house.
    Winner { wallet: String, stake: Amount },
    /// Draw or pre-match cancel: both seats get their stake back.
    Refund { wallets: [String; 2], stake: Amount },
}

/// A transfer that actually went out, for balance notifications.
#[derive(Clone, Debug)]
pub struct CompletedTransfer {
    pub wallet: String,
    pub amount: Amount,
    pub memo: String,
}

pub async fn execute(
    oracle: &PaymentOracle,
    house_account: Option<&str>,
    plan: SettlementPlan,
) -> Vec<CompletedTransfer> {
    let mut completed = Vec::new();
    match plan {
        SettlementPlan::Winner { wallet, stake } => {
            let payouts = compute(stake);
            match oracle.send_outbound(&wallet, payouts.payout).await {
                Ok(reference) => completed.push(CompletedTransfer {
                    wallet: wallet.clone(),
                    amount: payouts.payout,
                    memo: format!("winnings ({reference})"),
                }),
                Err(err) => {
                    warn!(wallet, amount = payouts.payout, ?err, "winner payout failed");
                }
            }
            match house_account {
                Some(house) => {
                    if let Err(err) = oracle.send_outbound(house, payouts.house_cut).await {
                        warn!(house, amount = payouts.house_cut, ?err, "house cut failed");
                    }
                }
                None => warn!(
                    amount = payouts.house_cut,
                    "no house account configured, cut unswept"
                ),
            }
        }
        SettlementPlan::Refund { wallets, stake } => {
            for wallet in wallets {
                match oracle.send_outbound(&wallet, stake).await {
                    Ok(reference) => completed.push(CompletedTransfer {
                        wallet: wallet.clone(),
                        amount: stake,
                        memo: format!("stake refund ({reference})"),
                    }),
                    Err(err) => warn!(wallet, stake, ?err, "refund failed"),
                }
            }
        }
    }
    completed
}
