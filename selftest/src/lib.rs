/*!

Provides utilities for testing `ci-operator-prowgen` end to end. A [`ReleaseRepo`] lays out the
configuration and job trees of a release repository in a temporary directory, so the binary can be
run against them and the files it writes can be inspected.

!*/

pub mod release_repo;

pub use release_repo::ReleaseRepo;
