// ── Provisioning events ──
//
// An `Envelope` is what the transport hands over: delivery metadata plus
// a JSON body. The body is the ticket system's record, keyed the way the
// producer has always written it (`DisplayName`, `Eid`, `UVPNDestIps` of
// `{"DestIp": ...}`). Shorter keys and plain string destinations are
// accepted as well.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::directory::Subject;
use crate::error::ProvisionError;

/// Transport metadata around one request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<String>,
    #[serde(default)]
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Milliseconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_timestamp: Option<i64>,
    /// The request, either inline or as a JSON-encoded string.
    pub body: Value,
}

impl Envelope {
    pub fn new(topic: impl Into<String>, body: Value) -> Self {
        Self {
            msg_id: None,
            topic: topic.into(),
            tag: None,
            store_timestamp: None,
            body,
        }
    }

    #[must_use]
    pub fn with_msg_id(mut self, msg_id: impl Into<String>) -> Self {
        self.msg_id = Some(msg_id.into());
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Parse one NDJSON line.
    pub fn from_line(line: &str) -> Result<Self, ProvisionError> {
        serde_json::from_str(line).map_err(|e| ProvisionError::Parse {
            reason: format!("envelope: {e}"),
        })
    }

    pub fn stored_at(&self) -> Option<DateTime<Utc>> {
        self.store_timestamp
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }

    pub fn request(&self) -> Result<ProvisioningRequest, ProvisionError> {
        ProvisioningRequest::from_body(&self.body)
    }
}

/// One destination entry. Older producers wrap each token in an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Destination {
    Plain(String),
    Entry {
        #[serde(rename = "DestIp", alias = "目标IP")]
        dest_ip: String,
    },
}

impl Destination {
    pub fn token(&self) -> &str {
        match self {
            Self::Plain(token) | Self::Entry { dest_ip: token } => token,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningRequest {
    /// Ticket or workflow name, informational.
    #[serde(rename = "SpName", alias = "ticket", default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,
    #[serde(rename = "Userid", alias = "user_id", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "DisplayName", alias = "name", alias = "姓名")]
    pub display_name: String,
    #[serde(
        rename = "Eid",
        alias = "id",
        alias = "工号",
        deserialize_with = "string_or_number"
    )]
    pub employee_id: String,
    #[serde(
        rename = "UVPNDestIps",
        alias = "destinations",
        alias = "UVPN权限",
        default
    )]
    pub destinations: Vec<Destination>,
}

impl ProvisioningRequest {
    pub fn new(
        display_name: impl Into<String>,
        employee_id: impl Into<String>,
        tokens: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            ticket: None,
            user_id: None,
            display_name: display_name.into(),
            employee_id: employee_id.into(),
            destinations: tokens
                .into_iter()
                .map(|t| Destination::Entry { dest_ip: t.into() })
                .collect(),
        }
    }

    /// Decode and validate a body. Name and id must both be non-blank,
    /// since together they are the directory key.
    pub fn from_body(body: &Value) -> Result<Self, ProvisionError> {
        let request: Self = match body {
            Value::String(raw) => serde_json::from_str(raw),
            other => Self::deserialize(other),
        }
        .map_err(|e| ProvisionError::Parse {
            reason: e.to_string(),
        })?;

        if request.display_name.trim().is_empty() {
            return Err(ProvisionError::Parse {
                reason: "display name is empty".into(),
            });
        }
        if request.employee_id.trim().is_empty() {
            return Err(ProvisionError::Parse {
                reason: "employee id is empty".into(),
            });
        }
        Ok(request)
    }

    pub fn subject(&self) -> Subject {
        Subject::new(self.display_name.trim(), self.employee_id.trim())
    }

    /// Destination tokens in request order.
    pub fn tokens(&self) -> Vec<&str> {
        self.destinations.iter().map(Destination::token).collect()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn producer_body_is_decoded() {
        let body = json!({
            "SpName": "UVPN权限",
            "Userid": "1987",
            "Eid": "1987",
            "DisplayName": "王二小",
            "UVPNDestIps": [{"DestIp": "10.16.3.0/24"}, {"DestIp": "192.168.5.9"}]
        });

        let request = ProvisioningRequest::from_body(&body).unwrap();
        assert_eq!(request.subject(), Subject::new("王二小", "1987"));
        assert_eq!(request.ticket.as_deref(), Some("UVPN权限"));
        assert_eq!(request.tokens(), vec!["10.16.3.0/24", "192.168.5.9"]);
    }

    #[test]
    fn short_keys_numeric_id_and_string_body_are_accepted() {
        let inner = json!({"name": "王二小", "id": 1987, "destinations": ["10.0.0.0/8"]});
        let body = Value::String(inner.to_string());

        let request = ProvisioningRequest::from_body(&body).unwrap();
        assert_eq!(request.employee_id, "1987");
        assert_eq!(request.tokens(), vec!["10.0.0.0/8"]);
    }

    #[test]
    fn blank_identity_fields_are_parse_errors() {
        for body in [
            json!({"DisplayName": "", "Eid": "1987"}),
            json!({"DisplayName": "王二小", "Eid": "  "}),
            json!({"Eid": "1987"}),
            json!("not json at all"),
        ] {
            let err = ProvisioningRequest::from_body(&body).unwrap_err();
            assert!(matches!(err, ProvisionError::Parse { .. }), "{body}");
        }
    }

    #[test]
    fn envelope_line_carries_metadata() {
        let line = r#"{"msg_id":"7F00","topic":"UVPN","tag":"UVPN","store_timestamp":1700000000000,"body":{"DisplayName":"王二小","Eid":"1987"}}"#;
        let envelope = Envelope::from_line(line).unwrap();

        assert_eq!(envelope.msg_id.as_deref(), Some("7F00"));
        assert_eq!(
            envelope.stored_at().unwrap().to_rfc3339(),
            "2023-11-14T22:13:20+00:00"
        );
        assert!(envelope.request().unwrap().destinations.is_empty());
        assert!(Envelope::from_line("{").is_err());
    }
}
