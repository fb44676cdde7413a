// Composite Evaluation Aggregator
// Merges the automated quiz score, the behavioral rubric and the hiring
// recommendation into one overall score, plus the grading collaborator.

pub mod aggregator;
pub mod grader;
pub mod handlers;
pub mod models;
pub mod service;
pub mod store;
