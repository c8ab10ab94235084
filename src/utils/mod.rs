pub mod unique_identifier;
