/// Result code the host's purchase screen finished with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityResult {
    Ok,
    Canceled,
    Other(i32),
}

impl From<i32> for ActivityResult {
    fn from(code: i32) -> Self {
        match code {
            -1 => ActivityResult::Ok,
            0 => ActivityResult::Canceled,
            other => ActivityResult::Other(other),
        }
    }
}
