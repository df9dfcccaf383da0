//! curl-style raw flags carried by adapters.

use std::time::Duration;
use tracing::warn;

use super::TransportConfig;

const VALUED: &[&str] = &[
    "--proxy",
    "-x",
    "--max-time",
    "-m",
    "--header",
    "-H",
    "--retry",
    "--retry-delay",
    "--connect-timeout",
    "--keepalive-time",
];

impl TransportConfig {
    /// Apply adapter-supplied flags on top of the current configuration.
    ///
    /// Values may follow as the next token or inline (`--max-time=30`).
    /// Unsupported flags and malformed values are logged and skipped.
    pub fn apply_raw(&mut self, raw: &[String]) {
        let mut tokens = raw.iter();
        while let Some(token) = tokens.next() {
            let (name, inline) = match token.split_once('=') {
                Some((n, v)) if n.starts_with("--") => (n, Some(v.to_string())),
                _ => (token.as_str(), None),
            };
            match name {
                "--insecure" | "-k" => self.insecure = true,
                "--http1.1" => self.http1_only = true,
                "--no-buffer" | "-N" => self.no_buffer = true,
                "--tcp-nodelay" => self.tcp_nodelay = true,
                "--compressed" => self.compressed = true,
                n if VALUED.contains(&n) => {
                    match inline.or_else(|| tokens.next().cloned()) {
                        Some(value) => self.apply_valued(n, &value),
                        None => warn!(flag = n, "raw transport flag is missing its value"),
                    }
                }
                other => warn!(flag = other, "ignoring unsupported raw transport flag"),
            }
        }
    }

    fn apply_valued(&mut self, name: &str, value: &str) {
        match name {
            "--proxy" | "-x" => self.proxy = Some(value.to_string()),
            "--header" | "-H" => match value.split_once(':') {
                Some((k, v)) if !k.trim().is_empty() => {
                    self.headers.push((k.trim().to_string(), v.trim().to_string()))
                }
                _ => warn!(value, "malformed raw header flag"),
            },
            "--retry" => match value.parse::<u32>() {
                Ok(n) => self.policy.retries = n,
                Err(_) => warn!(value, "invalid --retry value"),
            },
            _ => match parse_secs(value) {
                Some(d) => match name {
                    "--max-time" | "-m" => self.max_time = Some(d),
                    "--retry-delay" => self.policy.retry_delay = d,
                    "--connect-timeout" => self.policy.connect_timeout = d,
                    _ => self.policy.keepalive = d,
                },
                None => warn!(flag = name, value, "invalid duration in raw transport flag"),
            },
        }
    }

    /// curl-style rendering of the effective configuration, for logs.
    pub fn flags(&self) -> Vec<String> {
        let mut out = vec![
            "--retry".to_string(),
            self.policy.retries.to_string(),
            "--retry-delay".to_string(),
            self.policy.retry_delay.as_secs_f64().to_string(),
            "--keepalive-time".to_string(),
            self.policy.keepalive.as_secs_f64().to_string(),
            "--connect-timeout".to_string(),
            self.policy.connect_timeout.as_secs_f64().to_string(),
        ];
        if self.no_buffer {
            out.push("--no-buffer".to_string());
        }
        if self.tcp_nodelay {
            out.push("--tcp-nodelay".to_string());
        }
        if self.compressed {
            out.push("--compressed".to_string());
        }
        if self.insecure {
            out.push("--insecure".to_string());
        }
        if self.http1_only {
            out.push("--http1.1".to_string());
        }
        if let Some(p) = &self.proxy {
            out.push("--proxy".to_string());
            out.push(p.clone());
        }
        if let Some(t) = self.max_time {
            out.push("--max-time".to_string());
            out.push(t.as_secs_f64().to_string());
        }
        for (k, v) in &self.headers {
            out.push("--header".to_string());
            out.push(format!("{}: {}", k, v));
        }
        out
    }
}

fn parse_secs(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(Duration::from_secs_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportPolicy;

    fn raw(flags: &[&str]) -> Vec<String> {
        flags.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn known_flags_are_applied() {
        let mut c = TransportConfig::new(TransportPolicy::default(), false, false);
        c.apply_raw(&raw(&[
            "-k",
            "--proxy",
            "http://proxy:3128",
            "--max-time=30",
            "-H",
            "X-Trace: abc",
            "--retry",
            "5",
            "--retry-delay",
            "0.5",
            "--http1.1",
        ]));
        assert!(c.insecure);
        assert!(c.http1_only);
        assert_eq!(c.proxy.as_deref(), Some("http://proxy:3128"));
        assert_eq!(c.max_time, Some(Duration::from_secs(30)));
        assert_eq!(c.headers, vec![("X-Trace".to_string(), "abc".to_string())]);
        assert_eq!(c.policy.retries, 5);
        assert_eq!(c.policy.retry_delay, Duration::from_millis(500));
    }

    #[test]
    fn unknown_and_malformed_flags_are_skipped() {
        let mut c = TransportConfig::new(TransportPolicy::default(), false, false);
        let before = c.clone();
        c.apply_raw(&raw(&["--silent", "--max-time", "soon", "-H", "nocolon", "--proxy"]));
        assert_eq!(c, before);
    }

    #[test]
    fn no_buffer_flag_is_reported_for_buffered_requests() {
        let mut c = TransportConfig::new(TransportPolicy::default(), false, false);
        assert!(!c.flags().contains(&"--no-buffer".to_string()));
        c.apply_raw(&raw(&["-N"]));
        assert!(c.no_buffer);
        assert!(c.flags().contains(&"--no-buffer".to_string()));
    }

    #[test]
    fn rendering_reflects_stream_mode() {
        let c = TransportConfig::new(TransportPolicy::default(), true, false);
        let flags = c.flags();
        assert_eq!(&flags[..2], &["--retry", "3"]);
        assert!(flags.contains(&"--no-buffer".to_string()));
        assert!(!flags.contains(&"--compressed".to_string()));
    }
}
