//! One attack attempt: present the form, bind the answer, roll, report.

pub mod binder;
pub mod context;
pub mod evaluator;
pub mod expression;
pub mod form;
pub mod report;
pub mod resolver;
