mod user_record;

pub use user_record::UserRecord;
