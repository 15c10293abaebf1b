use std::{borrow::Cow, convert::Infallible, fmt, str::FromStr};

use schemars::{
    gen::SchemaGenerator,
    schema::{InstanceType, Schema, SchemaObject},
    JsonSchema,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The operational stages of a trip, in the order a trip passes through them.
/// The derived ordering is the lifecycle ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Pending,
    Accepted,
    ArrivedAtLoading,
    StagingArea,
    Loading,
    OnTrip,
    Offloading,
    Weighing,
    Depo,
    Handover,
    Delivered,
}

impl Stage {
    pub const ALL: [Stage; 11] = [
        Stage::Pending,
        Stage::Accepted,
        Stage::ArrivedAtLoading,
        Stage::StagingArea,
        Stage::Loading,
        Stage::OnTrip,
        Stage::Offloading,
        Stage::Weighing,
        Stage::Depo,
        Stage::Handover,
        Stage::Delivered,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The stored form.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::ArrivedAtLoading => "arrived-at-loading",
            Self::StagingArea => "staging-area",
            Self::Loading => "loading",
            Self::OnTrip => "on-trip",
            Self::Offloading => "offloading",
            Self::Weighing => "weighing",
            Self::Depo => "depo",
            Self::Handover => "handover",
            Self::Delivered => "delivered",
        }
    }

    /// The form shown to dispatchers.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::ArrivedAtLoading => "Arrived at Loading",
            Self::StagingArea => "Staging Area",
            Self::Loading => "Loading",
            Self::OnTrip => "On Trip",
            Self::Offloading => "Offloading",
            Self::Weighing => "Weighing",
            Self::Depo => "Depo",
            Self::Handover => "Handover",
            Self::Delivered => "Delivered",
        }
    }
}

/// Ways a trip can end without being delivered. These sit outside the stage
/// ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    Rejected,
    Cancelled,
    Stopped,
}

impl Termination {
    pub const ALL: [Termination; 3] =
        [Termination::Rejected, Termination::Cancelled, Termination::Stopped];

    pub fn slug(self) -> &'static str {
        match self {
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Stopped => "stopped",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Rejected => "Rejected",
            Self::Cancelled => "Cancelled",
            Self::Stopped => "Stopped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TripStatus {
    Stage(Stage),
    Terminated(Termination),
    /// Anything outside the vocabulary, kept verbatim so it can be shown and
    /// written back unchanged.
    Unspecified(String),
}

impl TripStatus {
    pub const PENDING: TripStatus = TripStatus::Stage(Stage::Pending);

    /// Parses a stored status. Never fails: values outside the vocabulary
    /// become `Unspecified`.
    ///
    /// Matching ignores case, surrounding whitespace and the choice between
    /// spaces, underscores and hyphens, so `"On Trip"`, `"on_trip"` and
    /// `"on-trip"` all read as [`Stage::OnTrip`].
    pub fn parse(raw: &str) -> Self {
        let normalized = normalize(raw);
        if let Some(stage) = Stage::ALL.into_iter().find(|s| s.slug() == normalized) {
            return Self::Stage(stage);
        }
        if let Some(termination) = Termination::ALL
            .into_iter()
            .find(|t| t.slug() == normalized)
        {
            return Self::Terminated(termination);
        }
        Self::Unspecified(raw.to_owned())
    }

    pub fn unspecified() -> Self {
        Self::Unspecified(String::new())
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage(stage) => Some(*stage),
            _ => None,
        }
    }

    pub fn is(&self, stage: Stage) -> bool {
        self.stage() == Some(stage)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Stage(stage) => stage.slug(),
            Self::Terminated(termination) => termination.slug(),
            Self::Unspecified(raw) => raw,
        }
    }

    pub fn label(&self) -> Cow<'_, str> {
        match self {
            Self::Stage(stage) => Cow::Borrowed(stage.label()),
            Self::Terminated(termination) => Cow::Borrowed(termination.label()),
            Self::Unspecified(raw) if raw.trim().is_empty() => {
                Cow::Borrowed("Unspecified")
            }
            Self::Unspecified(raw) => Cow::Owned(raw.trim().to_owned()),
        }
    }
}

fn normalize(raw: &str) -> String {
    raw.trim()
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

impl From<Stage> for TripStatus {
    fn from(value: Stage) -> Self {
        Self::Stage(value)
    }
}

impl From<Termination> for TripStatus {
    fn from(value: Termination) -> Self {
        Self::Terminated(value)
    }
}

impl FromStr for TripStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TripStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TripStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // null and missing statuses happen on half-migrated rows.
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .map(|raw| Self::parse(&raw))
            .unwrap_or_else(Self::unspecified))
    }
}

impl JsonSchema for TripStatus {
    fn schema_name() -> String {
        "TripStatus".to_owned()
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        SchemaObject {
            instance_type: Some(InstanceType::String.into()),
            enum_values: Some(
                Stage::ALL
                    .iter()
                    .map(|s| s.slug())
                    .chain(Termination::ALL.iter().map(|t| t.slug()))
                    .map(|slug| slug.into())
                    .collect(),
            ),
            ..Default::default()
        }
        .into()
    }
}
