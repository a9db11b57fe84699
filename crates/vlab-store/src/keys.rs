//! The `vlab:` key schema
//!
//! Every key the relay reads or writes is built here, so the schema shared
//! with the board servers and the lock reaper has a single point of truth.
//!
//! ```text
//! set            vlab:users
//! string         vlab:user:{id}:overlord            ("true" | absent)
//! set            vlab:user:{id}:allowedboards
//! set            vlab:boardclasses
//! set            vlab:boardclass:{id}:boards
//! set            vlab:boardclass:{id}:unlockedboards
//! string (TTL)   vlab:boardclass:{id}:locking       (advisory, never read)
//! string         vlab:knownboard:{id}:class
//! string         vlab:knownboard:{id}:type
//! string         vlab:knownboard:{id}:reset         ("true" | absent)
//! string         vlab:board:{id}:lock:username
//! string         vlab:board:{id}:lock:time          (epoch seconds)
//! string         vlab:board:{id}:server
//! string         vlab:board:{id}:port
//! string         vlab:board:{id}:user
//! integer        vlab:port                          (wraps 30000..35000)
//! ```

/// Set of every VLAB user id
pub const USERS: &str = "vlab:users";

/// Set of every board class id
pub const BOARD_CLASSES: &str = "vlab:boardclasses";

/// The shared ephemeral-port counter
pub const EPHEMERAL_PORT: &str = "vlab:port";

/// Present (as "true") when the user may acquire any board class
pub fn user_overlord(user: &str) -> String {
    format!("vlab:user:{user}:overlord")
}

/// Set of board classes the user is allowed to acquire
pub fn user_allowed_boards(user: &str) -> String {
    format!("vlab:user:{user}:allowedboards")
}

/// Set of all member boards of a class
pub fn class_boards(class: &str) -> String {
    format!("vlab:boardclass:{class}:boards")
}

/// Set of the class's boards not currently under a lease
pub fn class_unlocked_boards(class: &str) -> String {
    format!("vlab:boardclass:{class}:unlockedboards")
}

/// Advisory short-TTL marker written during acquisition; diagnostic only
pub fn class_locking_hint(class: &str) -> String {
    format!("vlab:boardclass:{class}:locking")
}

/// The class a known board belongs to
pub fn knownboard_class(board: &str) -> String {
    format!("vlab:knownboard:{board}:class")
}

/// The hardware type of a known board
pub fn knownboard_type(board: &str) -> String {
    format!("vlab:knownboard:{board}:type")
}

/// Present (as "true") when the board supports a post-session reset
pub fn knownboard_reset(board: &str) -> String {
    format!("vlab:knownboard:{board}:reset")
}

/// Current lease holder, absent when the board is unlocked
pub fn board_lock_username(board: &str) -> String {
    format!("vlab:board:{board}:lock:username")
}

/// Epoch seconds of the lease's acquisition or last refresh
pub fn board_lock_time(board: &str) -> String {
    format!("vlab:board:{board}:lock:time")
}

/// Hostname of the board server the board hangs off
pub fn board_server(board: &str) -> String {
    format!("vlab:board:{board}:server")
}

/// SSH port of the board's container on the board server
pub fn board_port(board: &str) -> String {
    format!("vlab:board:{board}:port")
}

/// Console account on the board's container
pub fn board_user(board: &str) -> String {
    format!("vlab:board:{board}:user")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_carry_the_vlab_namespace() {
        assert_eq!(user_overlord("alice"), "vlab:user:alice:overlord");
        assert_eq!(user_allowed_boards("alice"), "vlab:user:alice:allowedboards");
        assert_eq!(class_boards("zynq"), "vlab:boardclass:zynq:boards");
        assert_eq!(
            class_unlocked_boards("zynq"),
            "vlab:boardclass:zynq:unlockedboards"
        );
        assert_eq!(class_locking_hint("zynq"), "vlab:boardclass:zynq:locking");
        assert_eq!(board_lock_username("b1"), "vlab:board:b1:lock:username");
        assert_eq!(board_lock_time("b1"), "vlab:board:b1:lock:time");
        assert_eq!(board_server("b1"), "vlab:board:b1:server");
        assert_eq!(knownboard_reset("b1"), "vlab:knownboard:b1:reset");
    }
}
