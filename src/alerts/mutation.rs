//! Create, update and delete submissions
//!
//! Each mutation is one token fetch followed by one form submission, and
//! the service acknowledges it with a redirect. Form fields are assembled
//! and validated before the token fetch, so an invalid alert never causes
//! a request.

use crate::alerts::model::{Alert, DeliveryChoice, Frequency};
use crate::alerts::new_alert::NewAlert;
use crate::alerts::tokens::TokenFetcher;
use crate::config::ProtocolConfig;
use crate::session::Session;
use crate::transport::{FormBody, Transport};
use crate::{AlertsError, ValidationError};

/// Submits mutations with the current session
pub struct MutationCoordinator<'a> {
    transport: &'a Transport,
    session: &'a Session,
    protocol: &'a ProtocolConfig,
}

impl<'a> MutationCoordinator<'a> {
    pub fn new(
        transport: &'a Transport,
        session: &'a Session,
        protocol: &'a ProtocolConfig,
    ) -> Self {
        Self {
            transport,
            session,
            protocol,
        }
    }

    /// Creates an alert
    pub async fn create(&self, alert: &NewAlert) -> Result<(), AlertsError> {
        let mut form = create_form(self.protocol, self.session.email(), alert)?;

        let token = self.fetcher().fetch_token(&self.protocol.paths.create_form).await?;
        form.push(&self.protocol.fields.token, &token.into_inner());

        self.submit(&self.protocol.paths.create, &form).await?;
        tracing::info!("Created alert for \"{}\"", alert.query());
        Ok(())
    }

    /// Saves an edited alert under its handle
    pub async fn update(&self, alert: &Alert) -> Result<(), AlertsError> {
        alert.validate()?;
        let mut form = update_form(self.protocol, alert)?;

        let tokens = self.fetcher().fetch_edit_tokens(alert.handle()).await?;
        let fields = &self.protocol.fields;
        form.push(&fields.token, &tokens.token.into_inner());
        form.push(&fields.edit_tokens[0], &tokens.first.into_inner());
        form.push(&fields.edit_tokens[1], &tokens.second.into_inner());

        self.submit(&self.protocol.paths.save, &form).await?;
        tracing::info!("Updated alert {} (\"{}\")", alert.handle(), alert.query());
        Ok(())
    }

    /// Deletes an alert; the value is consumed since its handle is spent
    pub async fn delete(&self, alert: Alert) -> Result<(), AlertsError> {
        let mut form = delete_form(self.protocol, &alert);

        let token = self.fetcher().fetch_token(&self.protocol.paths.manage).await?;
        form.push(&self.protocol.fields.token, &token.into_inner());

        self.submit(&self.protocol.paths.save, &form).await?;
        tracing::info!("Deleted alert {} (\"{}\")", alert.handle(), alert.query());
        Ok(())
    }

    fn fetcher(&self) -> TokenFetcher<'_> {
        TokenFetcher::new(self.transport, self.session, self.protocol)
    }

    async fn submit(&self, path: &str, form: &FormBody) -> Result<(), AlertsError> {
        let url = self.transport.service_url(path)?;
        self.transport
            .post_form(url, Some(self.session), form)
            .await?
            .expect_redirect()?;
        Ok(())
    }
}

fn result_type_code<'p>(
    protocol: &'p ProtocolConfig,
    alert_type: &crate::alerts::ResultType,
) -> Result<&'p str, ValidationError> {
    protocol
        .result_type_code(alert_type)
        .ok_or_else(|| ValidationError::UnknownResultType(alert_type.label().to_string()))
}

/// Fields of a create submission, without the token
fn create_form(
    protocol: &ProtocolConfig,
    email: &str,
    alert: &NewAlert,
) -> Result<FormBody, ValidationError> {
    let fields = &protocol.fields;
    let (recipient, frequency) = match alert.delivery() {
        DeliveryChoice::Email => (email, alert.frequency()),
        DeliveryChoice::Feed => (protocol.delivery.feed_marker.as_str(), Frequency::AsItHappens),
    };

    let mut form = FormBody::new(protocol.encoding())
        .field(&fields.query, alert.query())
        .field(&fields.email, recipient)
        .field(&fields.frequency, &protocol.frequency_choice(frequency).code)
        .field(&fields.result_type, result_type_code(protocol, alert.result_type())?);

    push_volume(&mut form, protocol, alert.volume())?;
    form.encode()?;
    Ok(form)
}

/// Fields of a save submission, without the tokens
fn update_form(protocol: &ProtocolConfig, alert: &Alert) -> Result<FormBody, ValidationError> {
    let fields = &protocol.fields;
    let delivery_code = match alert.delivery().choice() {
        DeliveryChoice::Email => &protocol.delivery.email_code,
        DeliveryChoice::Feed => &protocol.delivery.feed_code,
    };

    let mut form = FormBody::new(protocol.encoding())
        .field(&fields.delivery, delivery_code)
        .field(&fields.email, alert.owner_email())
        .field(&fields.query, alert.query())
        .field(&fields.save.name, &fields.save.value)
        .field(&fields.result_type, result_type_code(protocol, alert.result_type())?);

    if alert.delivery().is_email() {
        form.push(
            &fields.frequency,
            &protocol.frequency_choice(alert.frequency()).code,
        );
    }
    push_volume(&mut form, protocol, alert.volume())?;
    form.encode()?;
    Ok(form)
}

/// Fields of a delete submission, without the token
fn delete_form(protocol: &ProtocolConfig, alert: &Alert) -> FormBody {
    let fields = &protocol.fields;
    FormBody::new(protocol.encoding())
        .field(&fields.delete.name, &fields.delete.value)
        .field(&fields.email, alert.owner_email())
        .field(&fields.handle, alert.handle())
}

fn push_volume(
    form: &mut FormBody,
    protocol: &ProtocolConfig,
    volume: Option<crate::alerts::Volume>,
) -> Result<(), ValidationError> {
    match (&protocol.volumes, volume) {
        (Some(table), Some(volume)) => {
            let choice = protocol
                .volume_choice(volume)
                .ok_or(ValidationError::VolumeNotSupported)?;
            form.push(&table.field, &choice.code);
            Ok(())
        }
        (None, Some(_)) => Err(ValidationError::VolumeNotSupported),
        (_, None) => Ok(()),
    }
}
