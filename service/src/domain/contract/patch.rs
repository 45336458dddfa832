//! [`Patch`]ing of a [`Contract`].

use common::Money;
use derive_more::{Display, Error as StdError};
use rust_decimal::Decimal;

use super::{Contract, Description, Period, Status, Title};
#[cfg(doc)]
use super::{schedule, Milestone, Value};

/// Partial update of a [`Contract`]: a sparse set of new field values.
///
/// Only the fields present in a [`Patch`] are merged, and the yearly costs
/// reduction profile is replaced as a whole. [`Milestone`]s are never
/// patched directly: moving the period end makes the scheduler regenerate
/// them (see [`schedule::reschedule`]).
#[derive(Clone, Debug, Default)]
pub struct Patch {
    /// New [`Title`].
    pub title: Option<Title>,

    /// New [`Description`].
    pub description: Option<Description>,

    /// New [`Status`].
    pub status: Option<Status>,

    /// New [`Period`], always carrying both boundaries.
    pub period: Option<Period>,

    /// Update of the [`Value`].
    pub value: Option<ValuePatch>,
}

/// Partial update of a [`Contract`]'s [`Value`].
#[derive(Clone, Debug, Default)]
pub struct ValuePatch {
    /// New total amount.
    pub amount: Option<Money>,

    /// New paid amount.
    pub amount_paid: Option<Money>,

    /// New yearly costs reduction profile, replacing the current one as a
    /// whole.
    pub annual_costs_reduction: Option<Vec<Decimal>>,
}

impl Patch {
    /// Validates this [`Patch`] against the current state of the provided
    /// [`Contract`].
    ///
    /// Preconditions are checked in a fixed order, and the first violated
    /// one is reported:
    /// 1. the [`Contract`] status permits edits at all;
    /// 2. terminating reconciles the paid amounts;
    /// 3. the period start is still mutable;
    /// 4. the new period end keeps both the period and the already started
    ///    [`Milestone`]s consistent.
    ///
    /// # Errors
    ///
    /// See [`Error`] variants for the violated preconditions.
    pub fn validate(&self, contract: &Contract) -> Result<(), Error> {
        let checks: [fn(&Self, &Contract) -> Result<(), Error>; 4] = [
            Self::check_status_allows_edit,
            Self::check_termination_reconciles_paid,
            Self::check_start_date_mutable,
            Self::check_end_date_consistent,
        ];
        checks.into_iter().try_for_each(|check| check(self, contract))
    }

    /// [`Contract`] fields may be edited in the current [`Status`] only.
    fn check_status_allows_edit(
        &self,
        contract: &Contract,
    ) -> Result<(), Error> {
        if contract.status.allows_edit() {
            Ok(())
        } else {
            Err(Error::InvalidState(contract.status))
        }
    }

    /// Termination requires the declared paid amount to reconcile with the
    /// sum paid across [`Milestone`]s, up to the reconciliation tolerance.
    fn check_termination_reconciles_paid(
        &self,
        contract: &Contract,
    ) -> Result<(), Error> {
        if self.status != Some(Status::Terminated) {
            return Ok(());
        }

        let paid: Decimal = contract
            .milestones
            .iter()
            .map(|m| m.amount_paid.amount)
            .sum();
        let declared = self
            .value
            .as_ref()
            .and_then(|v| v.amount_paid)
            .unwrap_or(contract.value.amount_paid)
            .amount;

        if (paid - declared).abs() <= tolerance() {
            Ok(())
        } else {
            Err(Error::ConflictingAmount { declared, paid })
        }
    }

    /// The period start is correctable only until the [`Contract`] takes
    /// effect.
    fn check_start_date_mutable(
        &self,
        contract: &Contract,
    ) -> Result<(), Error> {
        let Some(period) = &self.period else {
            return Ok(());
        };

        if period.started_at == contract.period.started_at
            || contract.status == Status::Pending
        {
            Ok(())
        } else {
            Err(Error::ImmutableField)
        }
    }

    /// The new period must stay ordered, and its end must follow every
    /// already started [`Milestone`].
    fn check_end_date_consistent(
        &self,
        contract: &Contract,
    ) -> Result<(), Error> {
        let Some(period) = &self.period else {
            return Ok(());
        };

        if !period.is_ordered() {
            return Err(Error::InvalidPeriod);
        }
        if period.ended_at == contract.period.ended_at {
            return Ok(());
        }
        if let Some(last) = contract.last_started_milestone() {
            if period.ended_at <= last.period.started_at {
                return Err(Error::InvalidPeriod);
            }
        }

        Ok(())
    }
}

impl Contract {
    /// Merges the validated [`Patch`] into this [`Contract`].
    ///
    /// Only the fields present in the [`Patch`] are touched. [`Milestone`]s
    /// are left alone: rescheduling them is the scheduler's job.
    pub fn apply(&mut self, patch: Patch) {
        let Patch {
            title,
            description,
            status,
            period,
            value,
        } = patch;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(status) = status {
            self.status = status;
        }
        if let Some(period) = period {
            self.period = period;
        }
        if let Some(value) = value {
            let ValuePatch {
                amount,
                amount_paid,
                annual_costs_reduction,
            } = value;

            if let Some(amount) = amount {
                self.value.amount = amount;
            }
            if let Some(amount_paid) = amount_paid {
                self.value.amount_paid = amount_paid;
            }
            if let Some(profile) = annual_costs_reduction {
                self.value.annual_costs_reduction = profile;
            }
        }
    }
}

/// Tolerance for reconciling the paid amounts on termination.
fn tolerance() -> Decimal {
    Decimal::new(1, 2)
}

/// Error of validating a [`Patch`] against a [`Contract`].
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Declared paid amount does not reconcile with the sum paid across
    /// [`Milestone`]s.
    #[display(
        "declared `amountPaid` of {declared} does not reconcile with \
         {paid} paid across milestones"
    )]
    ConflictingAmount {
        /// Paid amount the [`Patch`] commits to.
        declared: Decimal,

        /// Paid amount actually accumulated by [`Milestone`]s.
        paid: Decimal,
    },

    /// Period start cannot be changed anymore.
    #[display(
        "`period.startDate` can only be corrected before the contract takes \
         effect"
    )]
    ImmutableField,

    /// New period is malformed, or its end does not follow the already
    /// started [`Milestone`]s.
    #[display(
        "`period.endDate` must follow both `period.startDate` and the \
         latest started milestone"
    )]
    InvalidPeriod,

    /// Current [`Contract`] status forbids any edits.
    #[display("contract in `{_0}` status cannot be edited")]
    InvalidState(#[error(not(source))] Status),
}

#[cfg(test)]
mod spec {
    use common::{money::Currency, DateTime, Money};
    use rust_decimal::Decimal;

    use crate::domain::contract::{
        self, milestone, schedule, Contract, Period, Value,
    };

    use super::{Error, Patch, ValuePatch};

    fn dt(input: &str) -> DateTime {
        DateTime::from_rfc3339(input).unwrap()
    }

    fn uah(amount: &str) -> Money {
        Money {
            amount: amount.parse().unwrap(),
            currency: Currency::Uah,
        }
    }

    /// Active contract with the first milestone underway and the rest
    /// scheduled, like a freshly activated one.
    fn contract() -> Contract {
        let now = dt("2018-04-27T06:58:56.919991Z");
        let period = Period {
            started_at: now,
            ended_at: dt("2029-04-27T06:58:56.919991Z"),
        };
        let value = Value {
            amount: uah("1200000"),
            amount_paid: uah("0"),
            annual_costs_reduction: Vec::new(),
        };
        let mut milestones = schedule::initial(&period, &value, now);
        schedule::start_first(&mut milestones, now);

        Contract {
            id: contract::Id::new(),
            rev: contract::Revision::default(),
            title: contract::Title::new("ESCO contract").unwrap(),
            description: contract::Description::new("Lighting modernization")
                .unwrap(),
            status: contract::Status::Active,
            period,
            value,
            milestones,
            documents: Vec::new(),
            changes: Vec::new(),
            created_at: now.coerce(),
            modified_at: now.coerce(),
        }
    }

    #[test]
    fn rejects_edits_of_terminated_contract() {
        let mut terminated = contract();
        terminated.status = contract::Status::Terminated;

        let patch = Patch {
            title: contract::Title::new("Renamed"),
            ..Patch::default()
        };

        assert!(matches!(
            patch.validate(&terminated),
            Err(Error::InvalidState(contract::Status::Terminated)),
        ));
    }

    #[test]
    fn allows_edits_of_pending_and_active_contracts() {
        for status in [contract::Status::Pending, contract::Status::Active] {
            let mut c = contract();
            c.status = status;

            let patch = Patch {
                title: contract::Title::new("Renamed"),
                ..Patch::default()
            };

            assert!(
                patch.validate(&c).is_ok(),
                "rejected in `{status}` status",
            );
        }
    }

    #[test]
    fn termination_requires_reconciled_paid_amount() {
        let mut c = contract();
        c.milestones[0].amount_paid = uah("164677.28");

        let patch = Patch {
            status: Some(contract::Status::Terminated),
            value: Some(ValuePatch {
                amount_paid: Some(uah("100000")),
                ..ValuePatch::default()
            }),
            ..Patch::default()
        };

        assert!(matches!(
            patch.validate(&c),
            Err(Error::ConflictingAmount { declared, paid })
                if declared == Decimal::from(100_000)
                    && paid == "164677.28".parse().unwrap(),
        ));
    }

    #[test]
    fn termination_accepts_reconciled_paid_amount() {
        let mut c = contract();
        c.milestones[0].amount_paid = uah("164677.28");

        let patch = Patch {
            status: Some(contract::Status::Terminated),
            value: Some(ValuePatch {
                amount_paid: Some(uah("164677.28")),
                ..ValuePatch::default()
            }),
            ..Patch::default()
        };

        assert!(patch.validate(&c).is_ok());
    }

    #[test]
    fn termination_reconciles_within_tolerance() {
        let mut c = contract();
        c.milestones[0].amount_paid = uah("100000.01");

        let patch = Patch {
            status: Some(contract::Status::Terminated),
            value: Some(ValuePatch {
                amount_paid: Some(uah("100000")),
                ..ValuePatch::default()
            }),
            ..Patch::default()
        };

        assert!(patch.validate(&c).is_ok());
    }

    #[test]
    fn termination_falls_back_to_stored_paid_amount() {
        let mut c = contract();
        c.milestones[0].amount_paid = uah("164677.28");
        c.value.amount_paid = uah("164677.28");

        let patch = Patch {
            status: Some(contract::Status::Terminated),
            ..Patch::default()
        };

        assert!(patch.validate(&c).is_ok());
    }

    #[test]
    fn start_date_is_frozen_once_active() {
        let c = contract();

        let patch = Patch {
            period: Some(Period {
                started_at: dt("2018-05-01T00:00:00Z"),
                ended_at: c.period.ended_at,
            }),
            ..Patch::default()
        };

        assert!(matches!(patch.validate(&c), Err(Error::ImmutableField)));
    }

    #[test]
    fn start_date_is_correctable_while_pending() {
        let mut c = contract();
        c.status = contract::Status::Pending;

        let patch = Patch {
            period: Some(Period {
                started_at: dt("2018-05-01T00:00:00Z"),
                ended_at: c.period.ended_at,
            }),
            ..Patch::default()
        };

        assert!(patch.validate(&c).is_ok());
    }

    #[test]
    fn unchanged_start_date_passes_on_active_contract() {
        let c = contract();

        let patch = Patch {
            period: Some(Period {
                started_at: c.period.started_at,
                ended_at: dt("2024-04-27T06:58:56.919991Z"),
            }),
            ..Patch::default()
        };

        assert!(patch.validate(&c).is_ok());
    }

    #[test]
    fn end_date_must_follow_start_date() {
        let mut c = contract();
        c.status = contract::Status::Pending;

        let patch = Patch {
            period: Some(Period {
                started_at: dt("2020-01-01T00:00:00Z"),
                ended_at: dt("2019-01-01T00:00:00Z"),
            }),
            ..Patch::default()
        };

        assert!(matches!(patch.validate(&c), Err(Error::InvalidPeriod)));
    }

    #[test]
    fn end_date_must_follow_started_milestones() {
        let mut c = contract();
        // Make the third milestone the latest started one.
        c.milestones[1].status = milestone::Status::Terminated;
        c.milestones[2].status = milestone::Status::Pending;
        let third_started_at = c.milestones[2].period.started_at;

        let patch = Patch {
            period: Some(Period {
                started_at: c.period.started_at,
                ended_at: third_started_at,
            }),
            ..Patch::default()
        };

        assert!(matches!(patch.validate(&c), Err(Error::InvalidPeriod)));
    }

    #[test]
    fn end_date_over_scheduled_milestones_is_allowed() {
        let c = contract();

        // 2024-04-27 lands way past the only started milestone of 2018.
        let patch = Patch {
            period: Some(Period {
                started_at: c.period.started_at,
                ended_at: dt("2024-04-27T06:58:56.919991Z"),
            }),
            ..Patch::default()
        };

        assert!(patch.validate(&c).is_ok());
    }

    #[test]
    fn apply_merges_only_present_fields() {
        let mut c = contract();
        let description = c.description.clone();
        let period = c.period;

        c.apply(Patch {
            title: contract::Title::new("Street lighting ESCO"),
            value: Some(ValuePatch {
                annual_costs_reduction: Some(vec![Decimal::ONE; 12]),
                ..ValuePatch::default()
            }),
            ..Patch::default()
        });

        assert_eq!(c.title, contract::Title::new("Street lighting ESCO").unwrap());
        assert_eq!(c.description, description);
        assert_eq!(c.period, period);
        assert_eq!(c.value.amount, uah("1200000"));
        assert_eq!(c.value.annual_costs_reduction, vec![Decimal::ONE; 12]);
    }
}
