//! Social network clients used by Chorus.
//!
//! Only the Twitter/X v2 API is implemented: app-only authentication, user lookup,
//! paginated timeline and following listings, and the filtered stream.
pub mod twitter;
