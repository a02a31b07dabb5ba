//! Deterministic seed dataset shared by tests and local development:
//! two departments, four services across the payable/non-payable and
//! active/inactive corners, two citizens, two admins, and payment rows
//! covering the success/failure/mismatch cases.

use chrono::Utc;
use sqlx::Executor;

use jansetu_core::credentials;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

pub const DEPT_TRANSPORT: &str = "DEPT_7A2B9C01";
pub const DEPT_REVENUE: &str = "DEPT_3E4F5A02";

/// Payable, fee 500, active.
pub const SERVICE_LICENCE: &str = "SERV_101A2B";
/// Payable, fee 900, active.
pub const SERVICE_REGISTRATION: &str = "SERV_202B3C";
/// Non-payable, active.
pub const SERVICE_CERTIFICATE: &str = "SERV_303C4D";
/// Payable, fee 250, inactive.
pub const SERVICE_PERMIT_INACTIVE: &str = "SERV_404D5E";

pub const USER_ASHA: &str = "UID0A1B2C3D";
pub const USER_VIKRAM: &str = "UID9F8E7D6C";

pub const ADMIN_SUPER: &str = "A11AA22BB";
pub const ADMIN_CLERK: &str = "A33CC44DD";

/// Successful payment by Asha for the licence service, unlinked.
pub const TXN_SUCCESS: &str = "TXN-1001";
/// Failed payment by Asha for the licence service.
pub const TXN_FAILED: &str = "TXN-1002";
/// Successful payment by Asha, but for the registration service.
pub const TXN_OTHER_SERVICE: &str = "TXN-1003";
/// Successful payment by Vikram for the licence service, unlinked.
pub const TXN_VIKRAM: &str = "TXN-2001";

/// Every seeded account uses this password.
pub const SEED_PASSWORD: &str = "sunrise-gate-8";

pub struct SeedDataset;

impl SeedDataset {
    pub async fn load(pool: &DbPool) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = pool.begin().await?;

        for (dept_id, name, location) in [
            (DEPT_TRANSPORT, "Transport Department", "RTO Complex, MG Road"),
            (DEPT_REVENUE, "Revenue Department", "Collectorate Complex"),
        ] {
            tx.execute(
                sqlx::query(
                    "INSERT INTO department (dept_id, dept_name, office_location, created_at)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(dept_id)
                .bind(name)
                .bind(location)
                .bind(&now),
            )
            .await?;
        }

        for (service_id, dept_id, name, service_type, fee, active) in [
            (SERVICE_LICENCE, DEPT_TRANSPORT, "Driving Licence Renewal", "Payable", "500", 1i64),
            (SERVICE_REGISTRATION, DEPT_TRANSPORT, "Vehicle Registration", "Payable", "900", 1),
            (SERVICE_CERTIFICATE, DEPT_REVENUE, "Income Certificate", "NonPayable", "0", 1),
            (SERVICE_PERMIT_INACTIVE, DEPT_TRANSPORT, "Trade Permit", "Payable", "250", 0),
        ] {
            tx.execute(
                sqlx::query(
                    "INSERT INTO service (service_id, dept_id, service_name, service_type,
                                          fee, processing_time_days, is_active, created_at)
                     VALUES (?, ?, ?, ?, ?, 7, ?, ?)",
                )
                .bind(service_id)
                .bind(dept_id)
                .bind(name)
                .bind(service_type)
                .bind(fee)
                .bind(active)
                .bind(&now),
            )
            .await?;
        }

        for (user_id, full_name, email, mobile) in [
            (USER_ASHA, "Asha Rao", "asha@example.in", "9876543210"),
            (USER_VIKRAM, "Vikram Iyer", "vikram@example.in", "9876500000"),
        ] {
            let salt = credentials::generate_salt();
            let digest = credentials::digest_password(SEED_PASSWORD, &salt);
            tx.execute(
                sqlx::query(
                    "INSERT INTO user_account (user_id, full_name, email, mobile,
                                               credential_digest, credential_salt,
                                               language_preference, created_at)
                     VALUES (?, ?, ?, ?, ?, ?, 'en', ?)",
                )
                .bind(user_id)
                .bind(full_name)
                .bind(email)
                .bind(mobile)
                .bind(&digest)
                .bind(&salt)
                .bind(&now),
            )
            .await?;
        }

        for (admin_id, name, email, role) in [
            (ADMIN_SUPER, "Leela Menon", "leela@jansetu.gov.in", "super_admin"),
            (ADMIN_CLERK, "Ravi Kumar", "ravi@jansetu.gov.in", "admin"),
        ] {
            let salt = credentials::generate_salt();
            let digest = credentials::digest_password(SEED_PASSWORD, &salt);
            tx.execute(
                sqlx::query(
                    "INSERT INTO admin_account (admin_id, name, email, credential_digest,
                                                credential_salt, role, created_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(admin_id)
                .bind(name)
                .bind(email)
                .bind(&digest)
                .bind(&salt)
                .bind(role)
                .bind(&now),
            )
            .await?;
        }

        for (payment_id, user_id, service_id, transaction_ref, amount, status) in [
            ("PAY-1001", USER_ASHA, SERVICE_LICENCE, TXN_SUCCESS, "500", "Success"),
            ("PAY-1002", USER_ASHA, SERVICE_LICENCE, TXN_FAILED, "500", "Failed"),
            ("PAY-1003", USER_ASHA, SERVICE_REGISTRATION, TXN_OTHER_SERVICE, "900", "Success"),
            ("PAY-2001", USER_VIKRAM, SERVICE_LICENCE, TXN_VIKRAM, "500", "Success"),
        ] {
            tx.execute(
                sqlx::query(
                    "INSERT INTO payment (payment_id, user_id, service_id, transaction_ref,
                                          amount, payment_method, payment_status, paid_at)
                     VALUES (?, ?, ?, ?, ?, 'upi', ?, ?)",
                )
                .bind(payment_id)
                .bind(user_id)
                .bind(service_id)
                .bind(transaction_ref)
                .bind(amount)
                .bind(status)
                .bind(&now),
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Sanity check that the dataset landed; used by bootstrap smoke tests.
    pub async fn verify(pool: &DbPool) -> Result<bool, RepositoryError> {
        let counts: [(&str, i64); 4] = [
            ("department", 2),
            ("service", 4),
            ("user_account", 2),
            ("payment", 4),
        ];
        for (table, expected) in counts {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(pool)
                .await?;
            if count < expected {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::SeedDataset;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn seed_dataset_loads_and_verifies() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        SeedDataset::load(&pool).await.expect("seed");
        assert!(SeedDataset::verify(&pool).await.expect("verify"));
    }
}
