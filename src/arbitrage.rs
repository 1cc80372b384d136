use chrono::{DateTime, Utc};

use crate::models::ArbitrageOpportunity;
use crate::series::AlignedWindow;

/// A charging interval the pairing policy can draw from.
#[derive(Debug, Clone, Copy)]
pub struct ChargeEvent {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub energy: f64,
}

/// A discharging interval to be matched against an earlier charge.
#[derive(Debug, Clone, Copy)]
pub struct DischargeEvent {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub energy: f64,
}

/// Rule that picks which charge event filled the battery for a given
/// discharge. Candidates arrive sorted ascending by timestamp; returning
/// `None` leaves the discharge unmatched.
pub trait PairingPolicy {
    fn pair<'a>(
        &self,
        discharge: &DischargeEvent,
        candidates: &'a [ChargeEvent],
    ) -> Option<&'a ChargeEvent>;
}

/// Default policy: the cheapest charge strictly before the discharge within
/// the same calendar day. The earliest such charge wins price ties, so
/// results do not depend on how the input was ordered on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LowestPriorChargePrice;

impl PairingPolicy for LowestPriorChargePrice {
    fn pair<'a>(
        &self,
        discharge: &DischargeEvent,
        candidates: &'a [ChargeEvent],
    ) -> Option<&'a ChargeEvent> {
        let mut best: Option<&ChargeEvent> = None;
        for candidate in candidates {
            if candidate.timestamp >= discharge.timestamp {
                break;
            }
            if candidate.timestamp.date_naive() != discharge.timestamp.date_naive() {
                continue;
            }
            match best {
                Some(current) if candidate.price >= current.price => {}
                _ => best = Some(candidate),
            }
        }
        best
    }
}

/// Scans an aligned window for discharge slots priced above their paired
/// charge.
pub struct ArbitrageDetector {
    policy: Box<dyn PairingPolicy>,
}

impl Default for ArbitrageDetector {
    fn default() -> Self {
        Self {
            policy: Box::new(LowestPriorChargePrice),
        }
    }
}

impl ArbitrageDetector {
    pub fn with_policy(policy: Box<dyn PairingPolicy>) -> Self {
        Self { policy }
    }

    /// Detect opportunities across the window, ascending by discharge
    /// timestamp. Only strictly positive price spreads qualify.
    pub fn detect(&self, aligned: &AlignedWindow) -> Vec<ArbitrageOpportunity> {
        let charges: Vec<ChargeEvent> = (0..aligned.len())
            .filter(|&i| aligned.charge[i] > 0.0)
            .map(|i| ChargeEvent {
                timestamp: aligned.timestamps[i],
                price: aligned.price[i],
                energy: aligned.charge[i],
            })
            .collect();

        let mut opportunities = Vec::new();
        for i in 0..aligned.len() {
            if aligned.discharge[i] <= 0.0 {
                continue;
            }
            let discharge = DischargeEvent {
                timestamp: aligned.timestamps[i],
                price: aligned.price[i],
                energy: aligned.discharge[i],
            };
            if let Some(charge) = self.policy.pair(&discharge, &charges) {
                if discharge.price > charge.price {
                    opportunities.push(ArbitrageOpportunity {
                        timestamp: discharge.timestamp,
                        charge_price: charge.price,
                        discharge_price: discharge.price,
                        energy: discharge.energy,
                        price_difference: discharge.price - charge.price,
                    });
                }
            }
        }
        opportunities
    }
}
