//! Channel variables shared between the enter, update and hangup scripts of
//! one call. The gateway's variable store is the only state they have in
//! common.
use crate::agi::AgiChannel;
use base64::{Engine, engine::general_purpose::STANDARD};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::debug;

pub const CALL_IDENTIFIER: &str = "CALL_IDENTIFIER";
pub const CALLER_NAME: &str = "CALLER_NAME";
pub const UPDATE_STATUS: &str = "UPDATE_STATUS";

/// Display names are stored base64 encoded; quotes and non ASCII characters
/// do not survive the variable store otherwise.
pub fn encode_caller_name(name: &str) -> String {
    STANDARD.encode(name.as_bytes())
}

pub fn decode_caller_name(encoded: &str) -> Option<String> {
    let bytes = STANDARD.decode(encoded.trim()).ok()?;
    String::from_utf8(bytes).ok()
}

impl<R, W> AgiChannel<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// The backend case id for this channel, if one was stored.
    pub async fn call_identifier(&mut self) -> Option<String> {
        let value = self.variable(CALL_IDENTIFIER).await;
        debug!(?value, "call identifier lookup");
        value.into_value()
    }

    pub async fn store_call_identifier(&mut self, case_id: &str) -> String {
        self.set_variable(CALL_IDENTIFIER, case_id).await
    }

    /// Reads the call identifier back right after storing it. Returns the raw
    /// reply alongside the extracted value.
    pub async fn confirm_call_identifier(&mut self) -> (String, String) {
        let outcome = self
            .command(&format!("GET VARIABLE {}", CALL_IDENTIFIER))
            .await;
        let value = outcome.data().unwrap_or_default().to_string();
        (outcome.into_raw(), value)
    }

    pub async fn store_caller_name(&mut self, name: &str) -> String {
        self.set_variable(CALLER_NAME, encode_caller_name(name))
            .await
    }

    pub async fn store_update_status(&mut self, status: u16) -> String {
        self.set_variable(UPDATE_STATUS, status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(channel: AgiChannel<&[u8], Vec<u8>>) -> Vec<String> {
        let (_, out) = channel.into_parts();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_caller_name_encoding() {
        assert_eq!(encode_caller_name("Jean Dupont"), "SmVhbiBEdXBvbnQ=");
        assert_eq!(encode_caller_name(""), "");
        assert_eq!(
            decode_caller_name(&encode_caller_name("Hélène \"la patronne\"")).as_deref(),
            Some("Hélène \"la patronne\"")
        );
        assert_eq!(decode_caller_name("not base64!"), None);
    }

    #[tokio::test]
    async fn test_call_identifier_lookup() {
        let mut agi = AgiChannel::new(&b"200 result=1 (42)\n200 result=0\n"[..], Vec::new());
        assert_eq!(agi.call_identifier().await.as_deref(), Some("42"));
        assert_eq!(agi.call_identifier().await, None);
    }

    #[tokio::test]
    async fn test_store_variables() {
        let input = b"200 result=1\n200 result=1\n200 result=1\n200 result=1 (42)\n";
        let mut agi = AgiChannel::new(&input[..], Vec::new());
        agi.store_caller_name("Jean Dupont").await;
        agi.store_call_identifier("42").await;
        agi.store_update_status(204).await;
        let (raw, value) = agi.confirm_call_identifier().await;
        assert_eq!(raw, "200 result=1 (42)");
        assert_eq!(value, "42");
        assert_eq!(
            written(agi),
            vec![
                r#"SET VARIABLE CALLER_NAME "SmVhbiBEdXBvbnQ=""#,
                r#"SET VARIABLE CALL_IDENTIFIER "42""#,
                r#"SET VARIABLE UPDATE_STATUS "204""#,
                "GET VARIABLE CALL_IDENTIFIER",
            ]
        );
    }
}
