/// One reply from the gateway, e.g. `200 result=1 (value)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AgiResponse {
    pub code: u16,
    pub result: Option<String>,
    pub data: Option<String>,
    pub raw: String,
}

impl AgiResponse {
    /// Returns `None` when the line does not start with a three digit status
    /// code, which means the session is out of step with the gateway.
    pub fn parse(line: &str) -> Option<Self> {
        let raw = line.trim();
        let code = status_code(raw)?;
        let result = raw
            .split_whitespace()
            .find_map(|token| token.strip_prefix("result="))
            .map(str::to_string);
        Some(Self {
            code,
            result,
            data: parenthesised(raw).map(str::to_string),
            raw: raw.to_string(),
        })
    }

    pub fn is_success(&self) -> bool {
        self.code == 200
    }
}

fn status_code(line: &str) -> Option<u16> {
    let digits = line.get(..3)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match line.as_bytes().get(3) {
        None | Some(b' ') | Some(b'-') => digits.parse().ok(),
        _ => None,
    }
}

/// Interior of the parenthesised group of a reply line, spanning from the
/// first `(` to the last `)` so values containing parentheses survive.
pub fn parenthesised(line: &str) -> Option<&str> {
    let start = line.find('(')?;
    let end = line.rfind(')')?;
    if end <= start {
        return None;
    }
    Some(&line[start + 1..end])
}

/// Outcome of a single request/response exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Replied(AgiResponse),
    /// A line came back but it is not a gateway reply.
    Desync(String),
    /// Writing the command or reading the reply failed.
    Transport(String),
}

impl CommandOutcome {
    pub fn raw(&self) -> &str {
        match self {
            CommandOutcome::Replied(response) => &response.raw,
            CommandOutcome::Desync(line) => line,
            CommandOutcome::Transport(_) => "",
        }
    }

    pub fn into_raw(self) -> String {
        match self {
            CommandOutcome::Replied(response) => response.raw,
            CommandOutcome::Desync(line) => line,
            CommandOutcome::Transport(_) => String::new(),
        }
    }

    pub fn data(&self) -> Option<&str> {
        match self {
            CommandOutcome::Replied(response) => response.data.as_deref(),
            CommandOutcome::Desync(line) => parenthesised(line),
            CommandOutcome::Transport(_) => None,
        }
    }
}

/// Result of a `GET VARIABLE` lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableValue {
    Set(String),
    Unset,
    Failed,
}

impl VariableValue {
    pub fn as_str(&self) -> &str {
        match self {
            VariableValue::Set(value) => value,
            _ => "",
        }
    }

    pub fn into_value(self) -> Option<String> {
        match self {
            VariableValue::Set(value) => Some(value),
            _ => None,
        }
    }
}

/// Wraps `value` in double quotes for use as a single command argument.
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            // a raw line break would end the command early
            c if c.is_control() => quoted.push(' '),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
