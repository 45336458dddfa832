//! [`Contract`]-related definitions.

use axum::{extract::Path, Json};
use common::{money::Currency, DateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service::{
    command,
    domain::{
        self,
        contract::{change, milestone, patch, schedule},
    },
    query, Command as _, Query as _,
};
use uuid::Uuid;

use crate::{define_error, AsError, Context, Error};

use super::NotFoundError;

/// Energy service procurement contract under active management.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    /// ID of the `Contract`.
    pub id: Uuid,

    /// Revision of the `Contract`, bumped on every successful save.
    pub rev: u64,

    /// Title of the `Contract`.
    pub title: String,

    /// Description of the `Contract`.
    pub description: String,

    /// [`Status`] of the `Contract`.
    pub status: Status,

    /// Overall effective window of the `Contract`.
    pub period: Period,

    /// Financial summary of the `Contract`.
    pub value: Value,

    /// [`Milestone`]s of the `Contract`, ordered by sequence number.
    pub milestones: Vec<Milestone>,

    /// [`Change`]s declared on the `Contract`.
    pub changes: Vec<Change>,

    /// `DateTime` when the `Contract` was registered.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub created_at: DateTime,

    /// `DateTime` when the `Contract` was modified last time.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub modified_at: DateTime,
}

impl From<domain::Contract> for Contract {
    fn from(c: domain::Contract) -> Self {
        let domain::Contract {
            id,
            rev,
            title,
            description,
            status,
            period,
            value,
            milestones,
            documents: _,
            changes,
            created_at,
            modified_at,
        } = c;

        Self {
            id: id.into(),
            rev: rev.into(),
            title: title.to_string(),
            description: description.to_string(),
            status: status.into(),
            period: period.into(),
            value: value.into(),
            milestones: milestones.into_iter().map(Into::into).collect(),
            changes: changes.into_iter().map(Into::into).collect(),
            created_at: created_at.coerce(),
            modified_at: modified_at.coerce(),
        }
    }
}

/// Status of a [`Contract`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// The `Contract` is registered, but has not taken effect yet.
    Pending,

    /// The `Contract` is in effect.
    Active,

    /// The `Contract` is concluded and frozen.
    Terminated,
}

impl From<domain::contract::Status> for Status {
    fn from(status: domain::contract::Status) -> Self {
        use domain::contract::Status as S;
        match status {
            S::Pending => Self::Pending,
            S::Active => Self::Active,
            S::Terminated => Self::Terminated,
        }
    }
}

impl From<Status> for domain::contract::Status {
    fn from(status: Status) -> Self {
        match status {
            Status::Pending => Self::Pending,
            Status::Active => Self::Active,
            Status::Terminated => Self::Terminated,
        }
    }
}

/// Effective time window of a [`Contract`] or a [`Milestone`].
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct Period {
    /// `DateTime` when the window starts.
    #[serde(rename = "startDate", with = "common::datetime::serde::rfc3339")]
    pub started_at: DateTime,

    /// `DateTime` when the window ends.
    #[serde(rename = "endDate", with = "common::datetime::serde::rfc3339")]
    pub ended_at: DateTime,
}

impl From<domain::contract::Period> for Period {
    fn from(p: domain::contract::Period) -> Self {
        Self {
            started_at: p.started_at,
            ended_at: p.ended_at,
        }
    }
}

impl From<Period> for domain::contract::Period {
    fn from(p: Period) -> Self {
        Self {
            started_at: p.started_at,
            ended_at: p.ended_at,
        }
    }
}

/// Amount of money in some [`Currency`].
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct Money {
    /// Amount of the [`Money`].
    pub amount: Decimal,

    /// [`Currency`] of the amount.
    pub currency: Currency,
}

impl From<common::Money> for Money {
    fn from(m: common::Money) -> Self {
        Self {
            amount: m.amount,
            currency: m.currency,
        }
    }
}

impl From<Money> for common::Money {
    fn from(m: Money) -> Self {
        Self {
            amount: m.amount,
            currency: m.currency,
        }
    }
}

/// Financial summary of a [`Contract`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Value {
    /// Total [`Money`] amount of the `Contract`.
    pub amount: Money,

    /// [`Money`] amount actually paid against the `Contract` so far.
    pub amount_paid: Money,

    /// Yearly costs reduction profile of the `Contract`.
    pub annual_costs_reduction: Vec<Decimal>,
}

impl From<domain::contract::Value> for Value {
    fn from(v: domain::contract::Value) -> Self {
        let domain::contract::Value {
            amount,
            amount_paid,
            annual_costs_reduction,
        } = v;

        Self {
            amount: amount.into(),
            amount_paid: amount_paid.into(),
            annual_costs_reduction,
        }
    }
}

/// Yearly payment checkpoint of a [`Contract`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    /// ID of the `Milestone`, surviving rescheduling.
    pub id: Uuid,

    /// 1-based position of the `Milestone` within its `Contract`.
    pub sequence_number: u32,

    /// Title of the `Milestone`.
    pub title: String,

    /// Description of the `Milestone`.
    pub description: String,

    /// Service year slice of the `Contract` period covered by the
    /// `Milestone`.
    pub period: Period,

    /// [`MilestoneStatus`] of the `Milestone`.
    pub status: MilestoneStatus,

    /// Planned [`Money`] amount of the `Milestone`.
    pub value: Money,

    /// [`Money`] amount actually paid against the `Milestone`.
    pub amount_paid: Money,

    /// `DateTime` when the `Milestone` was generated.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub created_at: DateTime,

    /// `DateTime` when the `Milestone` was updated last time.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub modified_at: DateTime,
}

impl From<domain::contract::Milestone> for Milestone {
    fn from(m: domain::contract::Milestone) -> Self {
        let domain::contract::Milestone {
            id,
            sequence_number,
            title,
            description,
            period,
            status,
            value,
            amount_paid,
            created_at,
            modified_at,
        } = m;

        Self {
            id: id.into(),
            sequence_number: sequence_number.into(),
            title: title.into(),
            description: description.into(),
            period: period.into(),
            status: status.into(),
            value: value.into(),
            amount_paid: amount_paid.into(),
            created_at: created_at.coerce(),
            modified_at: modified_at.coerce(),
        }
    }
}

/// Status of a [`Milestone`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneStatus {
    /// The `Milestone` is planned for a future service year.
    Scheduled,

    /// The `Milestone`'s service year has started.
    Pending,

    /// The `Milestone` is the one being delivered now.
    Active,

    /// The `Milestone` is concluded.
    Terminated,
}

impl From<milestone::Status> for MilestoneStatus {
    fn from(status: milestone::Status) -> Self {
        use milestone::Status as S;
        match status {
            S::Scheduled => Self::Scheduled,
            S::Pending => Self::Pending,
            S::Active => Self::Active,
            S::Terminated => Self::Terminated,
        }
    }
}

/// Amendment workflow object declared on a [`Contract`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    /// ID of the `Change`.
    pub id: Uuid,

    /// Human-readable rationale of the `Change`.
    pub rationale: String,

    /// [`ChangeStatus`] of the `Change`.
    pub status: ChangeStatus,
}

impl From<domain::contract::Change> for Change {
    fn from(c: domain::contract::Change) -> Self {
        let domain::contract::Change {
            id,
            rationale,
            status,
        } = c;

        Self {
            id: id.into(),
            rationale,
            status: status.into(),
        }
    }
}

/// Status of a [`Change`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeStatus {
    /// The `Change` is still under consideration.
    Pending,

    /// The `Change` is applied to its `Contract`.
    Active,
}

impl From<change::Status> for ChangeStatus {
    fn from(status: change::Status) -> Self {
        use change::Status as S;
        match status {
            S::Pending => Self::Pending,
            S::Active => Self::Active,
        }
    }
}

/// Body of a [`Contract`] registration request.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    /// ID assigned to the `Contract` externally, if any.
    pub id: Option<Uuid>,

    /// Title of the `Contract`.
    pub title: String,

    /// Description of the `Contract`.
    pub description: String,

    /// [`Status`] the `Contract` arrives in.
    pub status: Status,

    /// Overall effective window of the `Contract`.
    pub period: Period,

    /// Financial summary of the `Contract`.
    pub value: ValueRequest,
}

impl CreateRequest {
    /// Converts this request into a [`command::CreateContract`].
    fn into_command(self) -> Result<command::CreateContract, Error> {
        let Self {
            id,
            title,
            description,
            status,
            period,
            value,
        } = self;

        Ok(command::CreateContract {
            id: id.map(Into::into),
            title: domain::contract::Title::new(title)
                .ok_or(InputError::Title)?,
            description: domain::contract::Description::new(description)
                .ok_or(InputError::Description)?,
            status: status.into(),
            period: period.into(),
            value: value.into(),
        })
    }
}

/// [`Value`] carried by a [`CreateRequest`].
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRequest {
    /// Total [`Money`] amount of the `Contract`.
    pub amount: Money,

    /// [`Money`] amount already paid against the `Contract`, zero when
    /// omitted.
    pub amount_paid: Option<Money>,

    /// Yearly costs reduction profile of the `Contract`.
    #[serde(default)]
    pub annual_costs_reduction: Vec<Decimal>,
}

impl From<ValueRequest> for domain::contract::Value {
    fn from(v: ValueRequest) -> Self {
        let ValueRequest {
            amount,
            amount_paid,
            annual_costs_reduction,
        } = v;

        Self {
            amount_paid: amount_paid.map_or_else(
                || common::Money::zero(amount.currency),
                Into::into,
            ),
            amount: amount.into(),
            annual_costs_reduction,
        }
    }
}

/// Body of a [`Contract`] patch request: a sparse set of new field values.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PatchRequest {
    /// New title.
    pub title: Option<String>,

    /// New description.
    pub description: Option<String>,

    /// New [`Status`].
    pub status: Option<Status>,

    /// New period, always carrying both boundaries.
    pub period: Option<Period>,

    /// Update of the value.
    pub value: Option<ValuePatchRequest>,
}

impl PatchRequest {
    /// Converts this request into a domain [`patch::Patch`].
    ///
    /// [`patch::Patch`]: domain::contract::Patch
    fn into_patch(self) -> Result<domain::contract::Patch, Error> {
        let Self {
            title,
            description,
            status,
            period,
            value,
        } = self;

        Ok(domain::contract::Patch {
            title: title
                .map(|t| {
                    domain::contract::Title::new(t).ok_or(InputError::Title)
                })
                .transpose()?,
            description: description
                .map(|d| {
                    domain::contract::Description::new(d)
                        .ok_or(InputError::Description)
                })
                .transpose()?,
            status: status.map(Into::into),
            period: period.map(Into::into),
            value: value.map(Into::into),
        })
    }
}

/// [`Value`] update carried by a [`PatchRequest`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValuePatchRequest {
    /// New total amount.
    pub amount: Option<Money>,

    /// New paid amount.
    pub amount_paid: Option<Money>,

    /// New yearly costs reduction profile, replacing the current one as a
    /// whole.
    pub annual_costs_reduction: Option<Vec<Decimal>>,
}

impl From<ValuePatchRequest> for patch::ValuePatch {
    fn from(v: ValuePatchRequest) -> Self {
        let ValuePatchRequest {
            amount,
            amount_paid,
            annual_costs_reduction,
        } = v;

        Self {
            amount: amount.map(Into::into),
            amount_paid: amount_paid.map(Into::into),
            annual_costs_reduction,
        }
    }
}

/// Registers a new [`Contract`] awarded by an external procurement system.
///
/// # Errors
///
/// See [`command::create_contract::ExecutionError`].
pub async fn create(
    context: Context,
    Json(req): Json<CreateRequest>,
) -> Result<(http::StatusCode, Json<Contract>), Error> {
    let contract = context
        .service()
        .execute(req.into_command()?)
        .await
        .map_err(AsError::into_error)?;

    tracing::info!(id = %contract.id, "created contract");

    Ok((http::StatusCode::CREATED, Json(contract.into())))
}

/// Fetches the [`Contract`] with the provided ID.
///
/// # Errors
///
/// Errors if the [`Contract`] does not exist.
pub async fn fetch(
    context: Context,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<Contract>, Error> {
    let contract = context
        .service()
        .execute(query::contract::ById::by(contract_id.into()))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| Error::from(NotFoundError::Contract))?;

    Ok(Json(contract.into()))
}

/// Patches the [`Contract`] with the provided ID, rescheduling its
/// [`Milestone`]s when the period end moves.
///
/// # Errors
///
/// See [`command::patch_contract::ExecutionError`].
pub async fn patch(
    context: Context,
    Path(contract_id): Path<Uuid>,
    Json(req): Json<PatchRequest>,
) -> Result<Json<Contract>, Error> {
    let contract = context
        .service()
        .execute(command::PatchContract {
            contract_id: contract_id.into(),
            patch: req.into_patch()?,
        })
        .await
        .map_err(AsError::into_error)?;

    tracing::info!(id = %contract.id, rev = %contract.rev, "updated contract");

    Ok(Json(contract.into()))
}

impl AsError for command::create_contract::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::AlreadyRegistered(_) => Error {
                code: "ALREADY_REGISTERED",
                status_code: http::StatusCode::CONFLICT,
                message: self.to_string(),
                backtrace: None,
            },
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidPeriod => Error {
                code: "INVALID_PERIOD",
                status_code: http::StatusCode::UNPROCESSABLE_ENTITY,
                message: self.to_string(),
                backtrace: None,
            },
        })
    }
}

impl AsError for command::patch_contract::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::ConflictingUpdate(_) => Error {
                code: "CONFLICTING_UPDATE",
                status_code: http::StatusCode::CONFLICT,
                message: self.to_string(),
                backtrace: None,
            },
            Self::ContractNotExists(_) => Error {
                code: "NOT_FOUND",
                status_code: http::StatusCode::NOT_FOUND,
                message: self.to_string(),
                backtrace: None,
            },
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidPatch(e) => return e.try_as_error(),
            Self::Reschedule(e) => return e.try_as_error(),
        })
    }
}

impl AsError for patch::Error {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error {
            code: match self {
                Self::ConflictingAmount { .. } => "CONFLICTING_AMOUNT",
                Self::ImmutableField => "IMMUTABLE_FIELD",
                Self::InvalidPeriod => "INVALID_PERIOD",
                Self::InvalidState(_) => "INVALID_STATE",
            },
            status_code: match self {
                Self::ConflictingAmount { .. } | Self::InvalidPeriod => {
                    http::StatusCode::UNPROCESSABLE_ENTITY
                }
                Self::ImmutableField | Self::InvalidState(_) => {
                    http::StatusCode::FORBIDDEN
                }
            },
            message: self.to_string(),
            backtrace: None,
        })
    }
}

impl AsError for schedule::Error {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error {
            code: "CONFIGURATION_ERROR",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: self.to_string(),
            backtrace: None,
        })
    }
}

define_error! {
    enum InputError {
        #[code = "INVALID_TITLE"]
        #[status = BAD_REQUEST]
        #[message = "`title` must be a non-empty trimmed string"]
        Title,

        #[code = "INVALID_DESCRIPTION"]
        #[status = BAD_REQUEST]
        #[message = "`description` must be a non-empty trimmed string"]
        Description,
    }
}

#[cfg(test)]
mod spec {
    use super::{PatchRequest, Status};

    #[test]
    fn deserializes_sparse_patch_request() {
        let req: PatchRequest = serde_json::from_str(
            r#"{
                "status": "TERMINATED",
                "value": {"amountPaid": {"amount": "100000", "currency": "UAH"}}
            }"#,
        )
        .unwrap();

        assert_eq!(req.status, Some(Status::Terminated));
        assert!(req.title.is_none());
        assert!(req.period.is_none());
        let value = req.value.unwrap();
        assert!(value.amount.is_none());
        assert_eq!(
            value.amount_paid.unwrap().amount,
            "100000".parse().unwrap(),
        );
    }

    #[test]
    fn deserializes_period_boundaries() {
        let req: PatchRequest = serde_json::from_str(
            r#"{
                "period": {
                    "startDate": "2018-04-27T06:58:56.919991Z",
                    "endDate": "2024-04-27T06:58:56.919991Z"
                }
            }"#,
        )
        .unwrap();

        let period = req.period.unwrap();
        assert_eq!(period.started_at.year(), 2018);
        assert_eq!(period.ended_at.year(), 2024);
    }
}
