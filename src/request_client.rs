use lazy_static::lazy_static;
use reqwest::ClientBuilder;

const USER_AGENT: &str = concat!("devicefarm-runner/", env!("CARGO_PKG_VERSION"));

// Signed URLs may be single-use, none of these clients retry.
lazy_static! {
    // Artifact downloads
    pub static ref REQUEST_CLIENT: reqwest::Client = ClientBuilder::new()
        .user_agent(USER_AGENT)
        .build()
        .unwrap();

    // Streaming uploads to signed URLs
    pub static ref STREAMING_CLIENT: reqwest::Client = ClientBuilder::new()
        .user_agent(USER_AGENT)
        .build()
        .unwrap();
}
