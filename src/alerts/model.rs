/// Alert entity definitions
///
/// An `Alert` only comes into existence by parsing a listing row; callers
/// change it through validating setters and hand it back for saving.
use crate::alerts::validation::validate_query;
use crate::config::ProtocolConfig;
use crate::ValidationError;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

/// Category of results an alert matches, as labelled by the service
///
/// The admissible set belongs to the protocol version, so this is a label
/// checked against the protocol rather than a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResultType(String);

impl ResultType {
    pub(crate) fn from_label(label: &str) -> Self {
        Self(label.to_string())
    }

    pub fn label(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How often email alerts are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    AsItHappens,
    OnceADay,
    OnceAWeek,
}

impl Frequency {
    pub const ALL: [Frequency; 3] = [Self::AsItHappens, Self::OnceADay, Self::OnceAWeek];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AsItHappens => "as-it-happens",
            Self::OnceADay => "once a day",
            Self::OnceAWeek => "once a week",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', " ").to_lowercase();
        Self::ALL
            .into_iter()
            .find(|frequency| frequency.as_str().replace('-', " ") == wanted)
            .ok_or_else(|| ValidationError::UnknownFrequency(s.to_string()))
    }
}

/// How many results an alert delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Volume {
    OnlyBest,
    All,
}

impl Volume {
    pub const ALL: [Volume; 2] = [Self::OnlyBest, Self::All];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnlyBest => "only-best",
            Self::All => "all",
        }
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Volume {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|volume| volume.as_str() == wanted)
            .ok_or_else(|| ValidationError::UnknownVolume(s.to_string()))
    }
}

/// Requested delivery method for a new or edited alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryChoice {
    Email,
    Feed,
}

impl FromStr for DeliveryChoice {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "feed" => Ok(Self::Feed),
            _ => Err(ValidationError::UnknownDelivery(s.to_string())),
        }
    }
}

/// Delivery of a listed alert
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Delivery {
    /// Results are mailed to the owning account's address
    Email { address: String },
    /// Results are published as a feed; the URL appears once the service
    /// has materialized it
    Feed { url: Option<String> },
}

impl Delivery {
    pub fn choice(&self) -> DeliveryChoice {
        match self {
            Self::Email { .. } => DeliveryChoice::Email,
            Self::Feed { .. } => DeliveryChoice::Feed,
        }
    }

    pub fn feed_url(&self) -> Option<&str> {
        match self {
            Self::Feed { url } => url.as_deref(),
            Self::Email { .. } => None,
        }
    }

    pub fn is_email(&self) -> bool {
        matches!(self, Self::Email { .. })
    }
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email { address } => write!(f, "email ({})", address),
            Self::Feed { url: Some(url) } => write!(f, "feed ({})", url),
            Self::Feed { url: None } => f.write_str("feed"),
        }
    }
}

/// One alert as listed by the service
#[derive(Debug, Clone)]
pub struct Alert {
    handle: String,
    query: String,
    result_type: ResultType,
    frequency: Frequency,
    volume: Option<Volume>,
    delivery: Delivery,
    owner_email: String,
    protocol: Arc<ProtocolConfig>,
}

/// Values read from one listing row
pub(crate) struct ListedFields {
    pub handle: String,
    pub query: String,
    pub result_type: ResultType,
    pub frequency: Frequency,
    pub volume: Option<Volume>,
    pub delivery: Delivery,
}

impl Alert {
    pub(crate) fn from_listing(
        fields: ListedFields,
        owner_email: &str,
        protocol: Arc<ProtocolConfig>,
    ) -> Self {
        Self {
            handle: fields.handle,
            query: fields.query,
            result_type: fields.result_type,
            frequency: fields.frequency,
            volume: fields.volume,
            delivery: fields.delivery,
            owner_email: owner_email.to_string(),
            protocol,
        }
    }

    /// Opaque row identifier issued by the service
    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn result_type(&self) -> &ResultType {
        &self.result_type
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn volume(&self) -> Option<Volume> {
        self.volume
    }

    pub fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    pub fn feed_url(&self) -> Option<&str> {
        self.delivery.feed_url()
    }

    pub fn owner_email(&self) -> &str {
        &self.owner_email
    }

    pub fn set_query(&mut self, query: &str) -> Result<(), ValidationError> {
        validate_query(query, &self.protocol)?;
        self.query = query.to_string();
        Ok(())
    }

    pub fn set_result_type(&mut self, label: &str) -> Result<(), ValidationError> {
        self.result_type = self
            .protocol
            .result_type(label)
            .ok_or_else(|| ValidationError::UnknownResultType(label.to_string()))?;
        Ok(())
    }

    /// Sets the delivery frequency of an email alert
    ///
    /// Feed alerts are always as-it-happens and refuse any other frequency.
    pub fn set_frequency(&mut self, frequency: Frequency) -> Result<(), ValidationError> {
        if !self.delivery.is_email() && frequency != Frequency::AsItHappens {
            return Err(ValidationError::FrequencyRequiresEmail);
        }
        self.frequency = frequency;
        Ok(())
    }

    pub fn set_volume(&mut self, volume: Volume) -> Result<(), ValidationError> {
        if !self.protocol.supports_volume() {
            return Err(ValidationError::VolumeNotSupported);
        }
        self.volume = Some(volume);
        Ok(())
    }

    /// Switches delivery method
    ///
    /// Email goes to the owning address. A feed keeps its URL if it already
    /// had one and is always delivered as-it-happens.
    pub fn set_delivery(&mut self, choice: DeliveryChoice) {
        self.delivery = match (choice, &self.delivery) {
            (DeliveryChoice::Email, _) => Delivery::Email {
                address: self.owner_email.clone(),
            },
            (DeliveryChoice::Feed, Delivery::Feed { url }) => Delivery::Feed { url: url.clone() },
            (DeliveryChoice::Feed, Delivery::Email { .. }) => Delivery::Feed { url: None },
        };
        if choice == DeliveryChoice::Feed {
            self.frequency = Frequency::AsItHappens;
        }
    }

    /// Re-checks every field against the protocol
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_query(&self.query, &self.protocol)?;
        if self.protocol.result_type_code(&self.result_type).is_none() {
            return Err(ValidationError::UnknownResultType(
                self.result_type.label().to_string(),
            ));
        }
        if self.volume.is_some() && !self.protocol.supports_volume() {
            return Err(ValidationError::VolumeNotSupported);
        }
        Ok(())
    }
}

impl PartialEq for Alert {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
            && self.query == other.query
            && self.result_type == other.result_type
            && self.frequency == other.frequency
            && self.delivery.choice() == other.delivery.choice()
            && self.feed_url() == other.feed_url()
    }
}

impl Eq for Alert {}

impl Hash for Alert {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
        self.query.hash(state);
        self.result_type.hash(state);
        self.frequency.hash(state);
        self.delivery.choice().hash(state);
        self.feed_url().hash(state);
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" [{}, {}, {}]",
            self.query, self.result_type, self.frequency, self.delivery
        )
    }
}
