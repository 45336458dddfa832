//! Scheduling of [`Milestone`]s across a [`Contract`] period.

use common::{DateTime, Money};
use derive_more::{Display, Error as StdError};
use rust_decimal::Decimal;

use super::{milestone, Contract, Milestone, Period, Value};

/// Generates the initial schedule of [`Milestone`]s covering the provided
/// [`Contract`] `period`.
///
/// One [`Milestone`] is generated per calendar year: the first one runs from
/// the period start to the next January 1, the following ones cover whole
/// calendar years, and the last one is clamped to the period end exactly.
/// The total [`Value`] amount is split across the generated [`Milestone`]s
/// (see [`split()`]), and all of them start out as
/// [`milestone::Status::Scheduled`].
#[must_use]
pub fn initial(period: &Period, value: &Value, now: DateTime) -> Vec<Milestone> {
    let mut slices = Vec::new();
    let mut cursor = period.started_at;
    while cursor < period.ended_at {
        let ended_at = cursor.next_year_start().min(period.ended_at);
        slices.push(Period {
            started_at: cursor,
            ended_at,
        });
        cursor = ended_at;
    }

    let shares = split(
        value.amount.amount,
        &value.annual_costs_reduction,
        slices.len(),
    );
    let currency = value.amount.currency;

    let mut milestones = Vec::with_capacity(slices.len());
    let mut seq = milestone::SequenceNumber::FIRST;
    for (period, share) in slices.into_iter().zip(shares) {
        let text = format!(
            "Milestone #{seq} of year {}",
            period.started_at.year(),
        );
        milestones.push(Milestone {
            id: milestone::Id::new(),
            sequence_number: seq,
            title: text.clone().into(),
            description: text.into(),
            period,
            status: milestone::Status::Scheduled,
            value: Money {
                amount: share,
                currency,
            },
            amount_paid: Money::zero(currency),
            created_at: now.coerce(),
            modified_at: now.coerce(),
        });
        seq = seq.next();
    }
    milestones
}

/// Recomputes the [`Milestone`]s of the `contract` for the new `period`.
///
/// [`Milestone`]s already underway keep their historical record: only the
/// [`milestone::Status::Scheduled`] suffix is regenerated, anchored at the
/// end of the last started [`Milestone`] (or at the new period start, if
/// none has started). Regenerated [`Milestone`]s cover one calendar year
/// each, with the last one clamped to the new period end exactly;
/// [`Milestone`]s scheduled beyond the new end are dropped. When the new end
/// lands within the year already underway, the final started [`Milestone`]
/// is clamped to it as well.
///
/// A regenerated [`Milestone`] keeps the ID and creation time of the
/// scheduled one it replaces (matched by sequence number), while appended
/// ones receive fresh IDs. Every touched [`Milestone`] has its modification
/// time set to `now`.
///
/// The [`Contract`] value not spoken for by the untouched [`Milestone`]s is
/// split across the regenerated ones (see [`split()`]).
///
/// # Errors
///
/// - [`Error::NoMilestones`] if the `contract` has no [`Milestone`]s at all:
///   a schedule cannot be anchored without them.
pub fn reschedule(
    contract: &Contract,
    period: &Period,
    now: DateTime,
) -> Result<Vec<Milestone>, Error> {
    if contract.milestones.is_empty() {
        return Err(Error::NoMilestones);
    }

    let mut milestones: Vec<Milestone> = contract
        .milestones
        .iter()
        .take_while(|m| !m.status.is_scheduled())
        .cloned()
        .collect();
    let kept = milestones.len();
    let anchor = milestones
        .last()
        .map_or(period.started_at, |m| m.period.ended_at);

    if let Some(last) = milestones.last_mut() {
        if last.period.ended_at > period.ended_at {
            last.period.ended_at = period.ended_at;
            last.modified_at = now.coerce();
        }
    }

    let mut slices = Vec::new();
    let mut cursor = anchor;
    while cursor < period.ended_at {
        let ended_at = cursor.add_calendar_year().min(period.ended_at);
        slices.push(Period {
            started_at: cursor,
            ended_at,
        });
        cursor = ended_at;
    }

    let spoken_for: Decimal = milestones.iter().map(|m| m.value.amount).sum();
    let remaining =
        (contract.value.amount.amount - spoken_for).max(Decimal::ZERO);
    let weights = contract
        .value
        .annual_costs_reduction
        .get(kept..)
        .unwrap_or_default();
    let shares = split(remaining, weights, slices.len());
    let currency = contract.value.amount.currency;

    let mut seq = milestones
        .last()
        .map_or(milestone::SequenceNumber::FIRST, |m| {
            m.sequence_number.next()
        });
    for (offset, (period, share)) in slices.into_iter().zip(shares).enumerate()
    {
        let recycled = contract.milestones.get(kept + offset);
        let text = format!(
            "Milestone #{seq} of year {}",
            period.started_at.year(),
        );
        milestones.push(Milestone {
            id: recycled.map_or_else(milestone::Id::new, |m| m.id),
            sequence_number: seq,
            title: text.clone().into(),
            description: text.into(),
            period,
            status: milestone::Status::Scheduled,
            value: Money {
                amount: share,
                currency,
            },
            amount_paid: Money::zero(currency),
            created_at: recycled.map_or_else(|| now.coerce(), |m| m.created_at),
            modified_at: now.coerce(),
        });
        seq = seq.next();
    }

    Ok(milestones)
}

/// Promotes the first [`Milestone`] to [`milestone::Status::Pending`] once
/// its [`Contract`] takes effect.
///
/// No-op if the first [`Milestone`] has already started.
pub fn start_first(milestones: &mut [Milestone], now: DateTime) {
    if let Some(first) = milestones.first_mut() {
        if first.status.is_scheduled() {
            first.status = milestone::Status::Pending;
            first.modified_at = now.coerce();
        }
    }
}

/// Splits the `remaining` amount into `count` shares.
///
/// The split is weighted by the yearly costs reduction `weights` when they
/// cover every share and sum up to a positive amount, and is equal
/// otherwise. Shares are rounded to 2 decimal places, with the last one
/// absorbing the rounding remainder, so the shares always sum up to
/// `remaining` exactly.
fn split(remaining: Decimal, weights: &[Decimal], count: usize) -> Vec<Decimal> {
    if count == 0 {
        return Vec::new();
    }

    let weighted = weights
        .get(..count)
        .map(|w| (w, w.iter().copied().sum::<Decimal>()));
    let mut shares = match weighted {
        Some((weights, total)) if total > Decimal::ZERO => weights
            .iter()
            .map(|w| (remaining * w / total).round_dp(2))
            .collect(),
        Some(_) | None => {
            vec![(remaining / Decimal::from(count)).round_dp(2); count]
        }
    };

    let allotted: Decimal = shares.iter().take(count - 1).copied().sum();
    shares[count - 1] = remaining - allotted;
    shares
}

/// Error of rescheduling [`Milestone`]s of a [`Contract`].
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// [`Contract`] has no [`Milestone`]s to anchor a schedule on.
    #[display("contract has no milestones to anchor a schedule on")]
    NoMilestones,
}
