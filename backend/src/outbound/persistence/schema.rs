//! Diesel table definitions for the training document tables.
//!
//! These definitions must match `backend/migrations` exactly. Every table
//! stores the whole aggregate in `document`; the remaining columns are
//! projections maintained on each write.

diesel::table! {
    /// Course documents.
    courses (id) {
        /// Primary key: the course id.
        id -> Uuid,
        /// Serialised `Course` aggregate, roster included.
        document -> Jsonb,
        /// Compare-and-set revision, equal to the document's `revision`.
        revision -> Int4,
        /// Creation timestamp, used for list ordering.
        created_at -> Timestamptz,
        /// Last write timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Participant documents.
    participants (id) {
        /// Primary key: the participant id.
        id -> Uuid,
        /// Projection of the company link, `NULL` when unaffiliated.
        company_id -> Nullable<Uuid>,
        /// Projection of the profile e-mail. Unique.
        email -> Text,
        /// Serialised `Participant` aggregate.
        document -> Jsonb,
        /// Compare-and-set revision.
        revision -> Int4,
        /// Creation timestamp, used for list ordering.
        created_at -> Timestamptz,
        /// Last write timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Company documents.
    companies (id) {
        /// Primary key: the company id.
        id -> Uuid,
        /// Projection of the RFC tax id. Unique.
        tax_id -> Text,
        /// Serialised `Company` aggregate, affiliates included.
        document -> Jsonb,
        /// Compare-and-set revision.
        revision -> Int4,
        /// Creation timestamp, used for list ordering.
        created_at -> Timestamptz,
        /// Last write timestamp.
        updated_at -> Timestamptz,
    }
}
