use crate::config::ProtocolConfig;
use crate::transport::is_encodable;
use crate::ValidationError;

/// Checks a query against the protocol's length limit and page charset
///
/// Length is counted in characters, as the web form counts it.
pub fn validate_query(query: &str, protocol: &ProtocolConfig) -> Result<(), ValidationError> {
    if query.trim().is_empty() {
        return Err(ValidationError::EmptyQuery);
    }

    let len = query.chars().count();
    if len > protocol.max_query_len {
        return Err(ValidationError::QueryTooLong {
            len,
            max: protocol.max_query_len,
        });
    }

    let encoding = protocol.encoding();
    if !is_encodable(encoding, query) {
        return Err(ValidationError::NotEncodable {
            field: "query".to_string(),
            charset: encoding.name().to_string(),
        });
    }

    Ok(())
}
