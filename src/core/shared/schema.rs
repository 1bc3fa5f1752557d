diesel::table! {
    meeting_requests (id) {
        id -> Int8,
        reference_number -> Nullable<Varchar>,
        title -> Varchar,
        meeting_date -> Nullable<Date>,
        alternate_date -> Nullable<Date>,
        category -> Varchar,
        subcategory -> Varchar,
        description -> Text,
        comments -> Text,
        classification -> Varchar,
        requestor_name -> Varchar,
        requestor_email -> Nullable<Varchar>,
        request_type -> Varchar,
        country -> Varchar,
        status -> Varchar,
        is_draft -> Bool,
        created_at -> Timestamptz,
        created_by -> Varchar,
        updated_at -> Timestamptz,
        updated_by -> Varchar,
    }
}

diesel::table! {
    meeting_request_audit_logs (id) {
        id -> Int8,
        meeting_request_id -> Int8,
        field_name -> Varchar,
        old_value -> Nullable<Text>,
        new_value -> Nullable<Text>,
        changed_by -> Varchar,
        changed_at -> Timestamptz,
    }
}

diesel::table! {
    meeting_request_attachments (id) {
        id -> Uuid,
        meeting_request_id -> Int8,
        file_name -> Varchar,
        file_size -> Int8,
        content_type -> Varchar,
        uploaded_by -> Varchar,
        uploaded_at -> Timestamptz,
        storage_path -> Text,
    }
}

diesel::joinable!(meeting_request_audit_logs -> meeting_requests (meeting_request_id));
diesel::joinable!(meeting_request_attachments -> meeting_requests (meeting_request_id));

diesel::allow_tables_to_appear_in_same_query!(
    meeting_requests,
    meeting_request_audit_logs,
    meeting_request_attachments,
);
