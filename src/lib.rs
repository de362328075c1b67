pub mod cli;
pub mod collectors;
pub mod exporter;

/// Build-time information generated by `built`.
pub mod built_info {
    #![allow(clippy::doc_markdown)]
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Version string shown by `--version` and the landing page.
#[must_use]
pub fn long_version() -> String {
    match built_info::GIT_COMMIT_HASH_SHORT {
        Some(hash) => format!("{} ({hash})", built_info::PKG_VERSION),
        None => built_info::PKG_VERSION.to_string(),
    }
}
