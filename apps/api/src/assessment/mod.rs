// Self-assessment domain: question bank, submission lifecycle, scoring and review.
// The scoring engine in `scoring` is pure; SQL lives in `repository` and `catalog`.

pub mod catalog;
pub mod handlers;
pub mod repository;
pub mod results;
pub mod scoring;
pub mod service;
