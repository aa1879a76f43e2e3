//! Build metadata captured by `build.rs`.

pub fn git_sha() -> &'static str {
    option_env!("MICROBATCH_GIT_SHA").unwrap_or("unknown")
}

pub fn git_tag() -> &'static str {
    option_env!("MICROBATCH_GIT_TAG").unwrap_or("unknown")
}
