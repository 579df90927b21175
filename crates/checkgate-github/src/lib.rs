//! Checkgate GitHub - GitHub REST API integration
//!
//! Implements the `CheckApi` interface against the GitHub REST v3 API:
//! check run creation and updates, pull request lookups, and paginated
//! review listings.

pub mod client;

pub use client::GitHubClient;
