//! Incentive math for scraped loads.
//!
//! A load's reward is a fixed share of its posted price, expressed both in
//! dollars and in gallons of diesel at a flat unit cost.

use crate::models::Badge;

/// Share of the load price paid out as reward.
pub const INCENTIVE_RATE: f64 = 0.02;

/// Dollar cost of one fuel unit (gallon of diesel).
pub const UNIT_FUEL_COST: f64 = 4.0;

/// Minimum price for a load to be badged as high-value.
pub const HIGH_VALUE_THRESHOLD: f64 = 2000.0;

/// Derived reward for one price string.
///
/// All fields are `NaN` when the price text holds no number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reward {
    pub price: f64,
    pub reward_amount: f64,
    pub fuel_units: f64,
    threshold: f64,
}

impl Reward {
    /// False when the price was unparsable; such rewards are never shown.
    pub fn is_displayable(&self) -> bool {
        self.reward_amount.is_finite() && self.fuel_units.is_finite()
    }

    /// Whether the load is valuable enough to badge.
    pub fn qualifies(&self) -> bool {
        self.is_displayable() && self.price >= self.threshold
    }

    pub fn badge(&self) -> Badge {
        Badge {
            label: format!(
                "GC: +${:.2} ({:.1} gal)",
                self.reward_amount, self.fuel_units
            ),
            title: format!(
                "Green Candle Reward: ${:.2} = {:.1} gallons of free fuel",
                self.reward_amount, self.fuel_units
            ),
        }
    }
}

/// Computes rewards from raw price text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardCalculator {
    pub incentive_rate: f64,
    pub unit_fuel_cost: f64,
    pub high_value_threshold: f64,
}

impl Default for RewardCalculator {
    fn default() -> Self {
        Self {
            incentive_rate: INCENTIVE_RATE,
            unit_fuel_cost: UNIT_FUEL_COST,
            high_value_threshold: HIGH_VALUE_THRESHOLD,
        }
    }
}

impl RewardCalculator {
    pub fn compute(&self, price_text: &str) -> Reward {
        let price = parse_price(price_text);
        let reward_amount = price * self.incentive_rate;
        Reward {
            price,
            reward_amount,
            fuel_units: reward_amount / self.unit_fuel_cost,
            threshold: self.high_value_threshold,
        }
    }
}

/// Parse a display price such as `"$2,500.00"` into a number.
///
/// Everything except ASCII digits and `.` is dropped, then the longest
/// leading `digits[.digits]` prefix is parsed. Returns `NaN` when no digit
/// survives.
pub fn parse_price(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_digit = false;
    for (i, c) in cleaned.char_indices() {
        match c {
            '.' if !seen_dot => seen_dot = true,
            '.' => break,
            _ => seen_digit = true,
        }
        end = i + 1;
    }

    if !seen_digit {
        return f64::NAN;
    }
    cleaned[..end]
        .trim_end_matches('.')
        .parse()
        .unwrap_or(f64::NAN)
}
