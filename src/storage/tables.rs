/// Gallery rows: tgid, name
pub const GALLERIES: &str = "gallery";

/// Gallery member files: gallery_id -> gallery eid, file_id -> blob key
pub const FILES: &str = "files";

/// Registered users: tgid, username, password
pub const USERS: &str = "users";
