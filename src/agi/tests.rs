use super::*;
use std::pin::Pin;
use std::task::{Context, Poll};

fn channel(input: &[u8]) -> AgiChannel<&[u8], Vec<u8>> {
    AgiChannel::new(input, Vec::new())
}

fn written(channel: AgiChannel<&[u8], Vec<u8>>) -> Vec<String> {
    let (_, out) = channel.into_parts();
    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

struct BrokenPipe;

impl AsyncWrite for BrokenPipe {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_read_channel_environment() {
    let input = b"agi_network: yes\n\
agi_request: agi://10.0.0.2/call_enter\n\
agi_callerid: 0612345678\n\
not a pair\n\
agi_arg_1 :  42 \n\
\n\
200 result=1\n";
    let mut agi = channel(input);
    let env = agi.read_channel_environment().await;
    assert_eq!(env.len(), 4);
    assert_eq!(env.get("agi_request"), Some("agi://10.0.0.2/call_enter"));
    assert_eq!(env.caller_id(), Some("0612345678"));
    assert_eq!(env.argument(1), Some("42"));
    assert_eq!(env.get("not a pair"), None);

    // the reply after the blank line is still there for the first command
    assert_eq!(agi.send_command("NOOP").await, "200 result=1");
}

#[tokio::test]
async fn test_environment_without_terminator() {
    let mut agi = channel(b"agi_callerid: 0611\nagi_channel: SIP/1");
    let env = agi.read_channel_environment().await;
    assert_eq!(env.caller_id(), Some("0611"));
    assert_eq!(env.channel(), "SIP/1");

    let mut agi = channel(b"");
    assert!(agi.read_channel_environment().await.is_empty());
}

#[tokio::test]
async fn test_send_command() {
    let mut agi = channel(b"  200 result=1  \n");
    assert_eq!(agi.send_command("ANSWER").await, "200 result=1");
    assert_eq!(written(agi), vec!["ANSWER"]);
}

#[tokio::test]
async fn test_send_command_on_closed_channel() {
    let mut agi = channel(b"");
    assert_eq!(agi.send_command("ANSWER").await, "");

    let mut agi = channel(b"");
    assert_eq!(
        agi.command("ANSWER").await,
        CommandOutcome::Transport("channel closed".to_string())
    );
}

#[tokio::test]
async fn test_send_command_on_broken_pipe() {
    let mut agi = AgiChannel::new(&b"200 result=1\n"[..], BrokenPipe);
    assert!(matches!(
        agi.command("ANSWER").await,
        CommandOutcome::Transport(_)
    ));
    assert_eq!(agi.get_variable("CALL_IDENTIFIER").await, "");
    assert_eq!(agi.variable("CALL_IDENTIFIER").await, VariableValue::Failed);
}

#[tokio::test]
async fn test_desync_reply() {
    let mut agi = channel(b"agi_extra: late\n");
    assert_eq!(
        agi.command("NOOP").await,
        CommandOutcome::Desync("agi_extra: late".to_string())
    );
}

#[tokio::test]
async fn test_verbose_escapes_quotes() {
    let mut agi = channel(b"200 result=1\n200 result=1\n");
    agi.verbose(r#"POST /x -> 500: {"error": "boom"}"#).await;
    agi.verbose_level("second\nline", 3).await;
    assert_eq!(
        written(agi),
        vec![
            r#"VERBOSE "POST /x -> 500: {\"error\": \"boom\"}" 1"#,
            r#"VERBOSE "second line" 3"#,
        ]
    );
}

#[tokio::test]
async fn test_get_variable() {
    let mut agi = channel(b"200 result=1 (42)\n200 result=0\n200 result=1 ()\n");
    assert_eq!(agi.get_variable("CALL_IDENTIFIER").await, "42");
    assert_eq!(agi.get_variable("CALL_IDENTIFIER").await, "");
    assert_eq!(agi.variable("CALL_IDENTIFIER").await, VariableValue::Unset);
    assert_eq!(
        written(agi),
        vec![
            "GET VARIABLE CALL_IDENTIFIER",
            "GET VARIABLE CALL_IDENTIFIER",
            "GET VARIABLE CALL_IDENTIFIER",
        ]
    );
}

#[tokio::test]
async fn test_set_variable() {
    let mut agi = channel(b"200 result=1\n511 Command Not Permitted on a dead channel\n");
    assert_eq!(
        agi.set_variable("CALLER_NAME", r#"Le "Boss""#).await,
        "200 result=1"
    );
    assert_eq!(
        agi.set_variable("UPDATE_STATUS", 200).await,
        "511 Command Not Permitted on a dead channel"
    );
    assert_eq!(
        written(agi),
        vec![
            r#"SET VARIABLE CALLER_NAME "Le \"Boss\"""#,
            r#"SET VARIABLE UPDATE_STATUS "200""#,
        ]
    );
}

#[tokio::test]
async fn test_exec() {
    let mut agi = channel(b"200 result=0\n200 result=0\n");
    agi.exec("Playback", "tt-monkeys").await;
    agi.exec("Hangup", "").await;
    assert_eq!(written(agi), vec!["EXEC Playback tt-monkeys", "EXEC Hangup"]);
}

#[tokio::test]
async fn test_hangup_notice_before_reply() {
    let mut agi = channel(b"HANGUP\n200 result=1 (7)\n");
    assert!(!agi.hung_up());
    assert_eq!(agi.get_variable("CALL_IDENTIFIER").await, "7");
    assert!(agi.hung_up());
}

#[tokio::test]
async fn test_usage_block_consumed_whole() {
    let input = b"520-Invalid command syntax.  Proper usage follows:\n\
 Usage: GET VARIABLE <variablename>\n\
520 End of proper usage.\n\
200 result=1 (9)\n";
    let mut agi = channel(input);
    match agi.command("GET VARIABLE").await {
        CommandOutcome::Replied(response) => {
            assert_eq!(response.code, 520);
            assert_eq!(response.raw.lines().count(), 3);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(agi.get_variable("CALL_IDENTIFIER").await, "9");
}

#[tokio::test]
async fn test_latin1_environment_value_keeps_session_in_sync() {
    let input = b"agi_channel: SIP/1\n\
agi_calleridname: H\xe9l\xe8ne\n\
agi_callingpres: 0\n\
agi_arg_1: 42\n\
\n\
200 result=1 (77)\n";
    let mut agi = channel(input);
    let env = agi.read_channel_environment().await;
    assert_eq!(env.len(), 4);
    assert_eq!(env.argument(1), Some("42"));
    assert_eq!(env.get("agi_calleridname"), Some("H\u{fffd}l\u{fffd}ne"));

    assert_eq!(agi.get_variable("CALL_IDENTIFIER").await, "77");
}

#[tokio::test]
async fn test_non_utf8_reply_is_consumed() {
    let mut agi = channel(b"200 result=1 (Ren\xe9)\n200 result=1\n");
    let outcome = agi.command("GET VARIABLE CALLER").await;
    assert_eq!(outcome.data(), Some("Ren\u{fffd}"));
    assert_eq!(agi.send_command("NOOP").await, "200 result=1");
}
