diesel::table! {
    master_reservations (reservation_id) {
        reservation_id -> Int8,
        name -> Varchar,
        booking_date -> Varchar,
        time_slot -> Varchar,
        people -> Varchar,
        dish_type -> Varchar,
        phone -> Varchar,
        email -> Varchar,
        notes -> Text,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    date_tables (date_key) {
        date_key -> Varchar,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    reservation_rows (date_key, row_number) {
        date_key -> Varchar,
        row_number -> Int4,
        name -> Varchar,
        time_slot -> Varchar,
        people -> Varchar,
        phone -> Varchar,
        email -> Varchar,
        booking_date -> Varchar,
        dish_type -> Varchar,
        notes -> Text,
        status -> Varchar,
        reservation_id -> Nullable<Int8>,
        sms_reply -> Text,
        confirmation_method -> Varchar,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    unknown_replies (id) {
        id -> Uuid,
        logged_at -> Timestamptz,
        phone -> Varchar,
        message -> Text,
        received_at -> Varchar,
        status -> Varchar,
    }
}

diesel::table! {
    email_outbox (id) {
        id -> Uuid,
        recipient -> Varchar,
        subject -> Varchar,
        body -> Text,
        state -> Varchar,
        last_error -> Nullable<Text>,
        created_at -> Nullable<Timestamptz>,
        processed_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(reservation_rows -> date_tables (date_key));

diesel::allow_tables_to_appear_in_same_query!(
    master_reservations,
    date_tables,
    reservation_rows,
    unknown_replies,
    email_outbox,
);
