//! Integration tests for seedup-drive
//!
//! Uses wiremock to simulate the Google Drive v3 API and verifies folder
//! listing, folder creation, the resumable upload protocol, and error
//! classification.

mod common;

mod test_folders;
mod test_resumable;
