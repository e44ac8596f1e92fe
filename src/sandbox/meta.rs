//! Isolate meta file parser
//!
//! `isolate --meta=<file>` writes one `key:value` pair per line describing how
//! the sandboxed program ended.

/// How the boxed program ended, as reported by isolate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaStatus {
    Exited,
    /// `RE`: nonzero exit
    RuntimeError,
    /// `SG`: killed by a signal
    Signaled,
    /// `TO`: time or wall-time limit
    TimedOut,
    /// `XX`: isolate itself failed
    InternalError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IsolateMeta {
    pub status: MetaStatus,
    pub exit_code: Option<i32>,
    pub exit_signal: Option<i32>,
    pub time_ms: u64,
    pub wall_time_ms: u64,
    /// Peak memory in KiB (`cg-mem` or `max-rss`, whichever is larger)
    pub memory_kb: u64,
    /// Whether isolate had to kill the program
    pub killed: bool,
    pub message: Option<String>,
}

fn seconds_to_ms(value: &str) -> Option<u64> {
    value.parse::<f64>().ok().map(|s| (s * 1000.0).round() as u64)
}

pub fn parse_meta(content: &str) -> IsolateMeta {
    let mut meta = IsolateMeta {
        status: MetaStatus::Exited,
        exit_code: None,
        exit_signal: None,
        time_ms: 0,
        wall_time_ms: 0,
        memory_kb: 0,
        killed: false,
        message: None,
    };
    let mut status = None;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "time" => meta.time_ms = seconds_to_ms(value).unwrap_or(0),
            "time-wall" => meta.wall_time_ms = seconds_to_ms(value).unwrap_or(0),
            "cg-mem" | "max-rss" => {
                if let Ok(kb) = value.parse::<u64>() {
                    meta.memory_kb = meta.memory_kb.max(kb);
                }
            }
            "exitcode" => meta.exit_code = value.parse().ok(),
            "exitsig" => meta.exit_signal = value.parse().ok(),
            "killed" => meta.killed = value == "1",
            "message" => meta.message = Some(value.to_string()),
            "status" => status = Some(value.to_string()),
            _ => {}
        }
    }

    meta.status = match status.as_deref() {
        Some("TO") => MetaStatus::TimedOut,
        Some("SG") => MetaStatus::Signaled,
        Some("RE") => MetaStatus::RuntimeError,
        Some("XX") => MetaStatus::InternalError,
        _ if meta.exit_signal.is_some() => MetaStatus::Signaled,
        _ if meta.exit_code.unwrap_or(0) != 0 => MetaStatus::RuntimeError,
        _ => MetaStatus::Exited,
    };

    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_exit() {
        let meta = parse_meta("time:0.015\ntime-wall:0.021\nmax-rss:3120\ncg-mem:4096\nexitcode:0\n");
        assert_eq!(meta.status, MetaStatus::Exited);
        assert_eq!(meta.exit_code, Some(0));
        assert_eq!(meta.time_ms, 15);
        assert_eq!(meta.wall_time_ms, 21);
        assert_eq!(meta.memory_kb, 4096);
        assert!(!meta.killed);
    }

    #[test]
    fn test_wall_time_limit() {
        let meta = parse_meta("time:0.002\ntime-wall:2.001\nkilled:1\nstatus:TO\nmessage:Time limit exceeded (wall clock)\n");
        assert_eq!(meta.status, MetaStatus::TimedOut);
        assert!(meta.killed);
        assert_eq!(meta.message.as_deref(), Some("Time limit exceeded (wall clock)"));
    }

    #[test]
    fn test_runtime_error_and_signal() {
        let re = parse_meta("exitcode:1\nstatus:RE\n");
        assert_eq!(re.status, MetaStatus::RuntimeError);
        assert_eq!(re.exit_code, Some(1));

        let sg = parse_meta("status:SG\nexitsig:11\n");
        assert_eq!(sg.status, MetaStatus::Signaled);
        assert_eq!(sg.exit_signal, Some(11));
    }

    #[test]
    fn test_internal_error_and_empty() {
        assert_eq!(parse_meta("status:XX\n").status, MetaStatus::InternalError);

        let empty = parse_meta("");
        assert_eq!(empty.status, MetaStatus::Exited);
        assert_eq!(empty.exit_code, None);
    }
}
