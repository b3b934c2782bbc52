//! SeaORM entity models
//!
//! Entities for the monitoring and enquiry tables

mod detected_change;
mod monitored_source;
mod user_enquiry;

pub use monitored_source::{
    Entity as MonitoredSourceEntity,
    Model as MonitoredSource,
    ActiveModel as MonitoredSourceActiveModel,
    Column as MonitoredSourceColumn,
};

pub use detected_change::{
    Entity as DetectedChangeEntity,
    Model as DetectedChange,
    ActiveModel as DetectedChangeActiveModel,
    Column as DetectedChangeColumn,
};

pub use user_enquiry::{
    Entity as UserEnquiryEntity,
    Model as UserEnquiry,
    ActiveModel as UserEnquiryActiveModel,
    Column as UserEnquiryColumn,
    AnswerState,
    NO_INFORMATION_FOUND,
};
