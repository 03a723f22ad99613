//! Validated requests for new alerts
//!
//! All fields are checked together in `build`, before any request is made,
//! so a rejected alert never leaves a partial trace on the service.

use crate::alerts::model::{DeliveryChoice, Frequency, ResultType, Volume};
use crate::alerts::validation::validate_query;
use crate::config::ProtocolConfig;
use crate::ValidationError;

/// A new alert that has passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAlert {
    query: String,
    result_type: ResultType,
    delivery: DeliveryChoice,
    frequency: Frequency,
    volume: Option<Volume>,
}

impl NewAlert {
    /// Starts a request for a feed alert delivered as-it-happens
    pub fn builder(query: &str, result_type: &str) -> NewAlertBuilder {
        NewAlertBuilder {
            query: query.to_string(),
            result_type: result_type.to_string(),
            delivery: DeliveryChoice::Feed,
            frequency: None,
            volume: None,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn result_type(&self) -> &ResultType {
        &self.result_type
    }

    pub fn delivery(&self) -> DeliveryChoice {
        self.delivery
    }

    /// Effective frequency; always as-it-happens for feeds
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn volume(&self) -> Option<Volume> {
        self.volume
    }
}

#[derive(Debug, Clone)]
pub struct NewAlertBuilder {
    query: String,
    result_type: String,
    delivery: DeliveryChoice,
    frequency: Option<Frequency>,
    volume: Option<Volume>,
}

impl NewAlertBuilder {
    pub fn delivery(mut self, delivery: DeliveryChoice) -> Self {
        self.delivery = delivery;
        self
    }

    /// Frequency for email delivery; ignored for feeds
    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn volume(mut self, volume: Volume) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Validates every field against the protocol
    pub fn build(self, protocol: &ProtocolConfig) -> Result<NewAlert, ValidationError> {
        validate_query(&self.query, protocol)?;

        let result_type = protocol
            .result_type(&self.result_type)
            .ok_or_else(|| ValidationError::UnknownResultType(self.result_type.clone()))?;

        let frequency = match self.delivery {
            DeliveryChoice::Feed => Frequency::AsItHappens,
            DeliveryChoice::Email => self.frequency.unwrap_or(Frequency::AsItHappens),
        };

        let volume = match (self.volume, protocol.supports_volume()) {
            (Some(_), false) => return Err(ValidationError::VolumeNotSupported),
            (None, true) => Some(Volume::OnlyBest),
            (volume, _) => volume,
        };

        Ok(NewAlert {
            query: self.query,
            result_type,
            delivery: self.delivery,
            frequency,
            volume,
        })
    }
}
