//! Validation and rewriting of options passed through to `claude`.

/// Flags that would break the stream-json contract or make no sense
/// when passed through, with the reason reported to the user.
const FORBIDDEN_FLAGS: &[(&str, &str)] = &[
    (
        "--verbose",
        "The --verbose flag conflicts with auto-claude's output formatting",
    ),
    (
        "-p",
        "The -p/--print flag conflicts with auto-claude's output handling",
    ),
    (
        "--print",
        "The -p/--print flag conflicts with auto-claude's output handling",
    ),
    (
        "--output-format",
        "The --output-format flag is managed by auto-claude",
    ),
    (
        "--input-format",
        "The --input-format flag is managed by auto-claude",
    ),
    ("-v", "The -v/--version flag cannot be passed through"),
    ("--version", "The -v/--version flag cannot be passed through"),
    ("-h", "The -h/--help flag cannot be passed through"),
    ("--help", "The -h/--help flag cannot be passed through"),
];

/// Flag that resumes a previous session by id.
pub const RESUME_FLAG: &str = "--resume";

/// Rejected pass-through option.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionsError {
    /// A flag on the deny list.
    #[error("{reason}")]
    Forbidden {
        /// The flag as given.
        flag: String,
        /// Why it is rejected.
        reason: &'static str,
    },
    /// A bare argument that is not the value of a preceding flag.
    #[error("Cannot pass non-option arguments to claude (found: '{0}'). Only flags starting with '-' are allowed.")]
    NonOption(String),
}

/// Check pass-through options against the deny list.
///
/// A token not starting with `-` is accepted only as the value of the
/// token right before it.
///
/// # Errors
///
/// Returns the first offending option.
pub fn validate_claude_options(options: &[String]) -> Result<(), OptionsError> {
    for (i, opt) in options.iter().enumerate() {
        let flag = opt.split('=').next().unwrap_or(opt);
        if let Some((_, reason)) = FORBIDDEN_FLAGS.iter().find(|(name, _)| *name == flag) {
            return Err(OptionsError::Forbidden {
                flag: opt.clone(),
                reason: *reason,
            });
        }

        if !opt.starts_with('-') {
            let follows_flag = i > 0 && options[i - 1].starts_with('-');
            if !follows_flag {
                return Err(OptionsError::NonOption(opt.clone()));
            }
        }
    }
    Ok(())
}

/// Returns true if the options already carry a resume directive.
#[must_use]
pub fn has_resume(options: &[String]) -> bool {
    options
        .iter()
        .any(|opt| opt == RESUME_FLAG || opt == "-r" || opt.starts_with("--resume="))
}

/// Options for a resumed attempt: `options` plus `--resume <session_id>`,
/// unless a resume directive is already present.
#[must_use]
pub fn with_resume(options: &[String], session_id: &str) -> Vec<String> {
    let mut resumed = options.to_vec();
    if !has_resume(options) {
        resumed.push(RESUME_FLAG.to_string());
        resumed.push(session_id.to_string());
    }
    resumed
}
