use std::time::Duration;

/// One command-file line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `worker <script>`: queue a job running `script`
    Worker(String),
    /// `dispatcher_msleep <N>`: pause the dispatcher for N ms
    DispatcherSleep(Duration),
    /// `dispatcher_wait`: block until every queued job has finished
    DispatcherWait,
    /// Anything else, kept for diagnostics
    Unknown(String),
}

const WORKER: &str = "worker";
const DISPATCHER_MSLEEP: &str = "dispatcher_msleep";
const DISPATCHER_WAIT: &str = "dispatcher_wait";

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ';'
}

impl Directive {
    /// Parse a command-file line; blank lines yield `None`.
    ///
    /// The keyword ends at the first whitespace or `;`, so
    /// `worker;increment0` is a worker directive. Separators before the
    /// keyword are ignored.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let start = line.trim_start_matches(is_separator);
        if start.is_empty() {
            return None;
        }
        let (keyword, rest) = start.split_once(is_separator).unwrap_or((start, ""));

        let directive = match keyword {
            WORKER => Directive::Worker(rest.trim_start().to_string()),
            DISPATCHER_MSLEEP => match rest
                .split(is_separator)
                .find(|t| !t.is_empty())
                .map(str::parse::<i64>)
            {
                Some(Ok(ms)) => Directive::DispatcherSleep(Duration::from_millis(ms.max(0) as u64)),
                _ => Directive::Unknown(line.to_string()),
            },
            DISPATCHER_WAIT => Directive::DispatcherWait,
            _ => Directive::Unknown(line.to_string()),
        };
        Some(directive)
    }
}
