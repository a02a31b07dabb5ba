//! Opaque identifier minting for rows the system creates itself.
//! Request identifiers are not minted here; they are store-generated and
//! monotonic.

use rand::Rng;

pub fn generate_user_id() -> String {
    format!("UID{:08X}", rand::thread_rng().gen::<u32>())
}

pub fn generate_admin_id() -> String {
    format!("A{:08X}", rand::thread_rng().gen::<u32>())
}

pub fn generate_department_id() -> String {
    format!("DEPT_{:08X}", rand::thread_rng().gen::<u32>())
}

pub fn generate_service_id() -> String {
    format!("SERV_{:06X}", rand::thread_rng().gen::<u32>() & 0xFF_FFFF)
}

/// Initial password handed to a freshly created admin, returned exactly
/// once by the creation endpoint.
pub fn generate_admin_password() -> String {
    format!("Jns@{:08X}", rand::thread_rng().gen::<u32>())
}

#[cfg(test)]
mod tests {
    use super::{
        generate_admin_id, generate_admin_password, generate_department_id, generate_service_id,
        generate_user_id,
    };

    #[test]
    fn identifiers_carry_their_prefixes() {
        assert!(generate_user_id().starts_with("UID"));
        assert!(generate_admin_id().starts_with('A'));
        assert!(generate_department_id().starts_with("DEPT_"));
        assert!(generate_service_id().starts_with("SERV_"));
    }

    #[test]
    fn generated_admin_password_passes_validation() {
        assert!(crate::validation::validate_password(&generate_admin_password()).is_ok());
    }
}
