pub mod rows;

use duckdb::Connection;
use r2d2::ManageConnection;

pub struct DuckDbConnectionManager {
    connection_string: String,
}

impl DuckDbConnectionManager {
    pub fn new(connection_string: String) -> Self {
        Self { connection_string }
    }
}

impl ManageConnection for DuckDbConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        Connection::open(&self.connection_string)
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute("SELECT 1", [])?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Creates the invoice tables if they are missing. Mixed-case identifiers are
/// quoted everywhere; the sanitizer's rewrites assume these exact names.
pub fn bootstrap_schema(conn: &Connection) -> Result<(), duckdb::Error> {
    conn.execute_batch(
        r#"
        CREATE SEQUENCE IF NOT EXISTS vendor_id_seq;
        CREATE SEQUENCE IF NOT EXISTS customer_id_seq;
        CREATE SEQUENCE IF NOT EXISTS invoice_id_seq;
        CREATE SEQUENCE IF NOT EXISTS line_item_id_seq;
        CREATE SEQUENCE IF NOT EXISTS payment_id_seq;

        CREATE TABLE IF NOT EXISTS "Vendor" (
            id INTEGER PRIMARY KEY DEFAULT nextval('vendor_id_seq'),
            name VARCHAR NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS "Customer" (
            id INTEGER PRIMARY KEY DEFAULT nextval('customer_id_seq'),
            name VARCHAR NOT NULL UNIQUE,
            address VARCHAR
        );

        CREATE TABLE IF NOT EXISTS "Invoice" (
            id INTEGER PRIMARY KEY DEFAULT nextval('invoice_id_seq'),
            invoice_number VARCHAR NOT NULL,
            date TIMESTAMP NOT NULL,
            due_date TIMESTAMP NOT NULL,
            amount DOUBLE NOT NULL,
            status VARCHAR NOT NULL,
            "vendorId" INTEGER NOT NULL REFERENCES "Vendor"(id),
            "customerId" INTEGER NOT NULL REFERENCES "Customer"(id)
        );

        CREATE TABLE IF NOT EXISTS "LineItem" (
            id INTEGER PRIMARY KEY DEFAULT nextval('line_item_id_seq'),
            description VARCHAR NOT NULL,
            quantity INTEGER NOT NULL,
            price DOUBLE NOT NULL,
            category VARCHAR NOT NULL,
            "invoiceId" INTEGER NOT NULL REFERENCES "Invoice"(id)
        );

        CREATE TABLE IF NOT EXISTS "Payment" (
            id INTEGER PRIMARY KEY DEFAULT nextval('payment_id_seq'),
            amount DOUBLE,
            method VARCHAR,
            paid_at TIMESTAMP,
            "invoiceId" INTEGER REFERENCES "Invoice"(id)
        );
        "#,
    )
}
