use std::collections::HashMap;

/// The `key: value` block the gateway sends before the first command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelEnvironment {
    vars: HashMap<String, String>,
}

impl ChannelEnvironment {
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut env = Self::default();
        for line in lines {
            if line.trim().is_empty() {
                break;
            }
            env.insert_line(line);
        }
        env
    }

    /// Lines without a colon are ignored.
    pub(crate) fn insert_line(&mut self, line: &str) {
        if let Some((key, value)) = line.split_once(':') {
            self.vars
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn caller_id(&self) -> Option<&str> {
        self.non_empty("agi_callerid")
            .or_else(|| self.non_empty("agi_calleridnum"))
    }

    /// Positional dialplan argument `agi_arg_<n>`; empty arguments count as absent.
    pub fn argument(&self, n: usize) -> Option<&str> {
        self.non_empty(&format!("agi_arg_{}", n))
    }

    pub fn channel(&self) -> &str {
        self.get("agi_channel").unwrap_or_default()
    }

    pub fn unique_id(&self) -> &str {
        self.get("agi_uniqueid").unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
