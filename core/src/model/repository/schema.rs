diesel::table! {
    Collection (collection_id) {
        collection_id -> BigInt,
        name -> Text,
        name_key -> Text,
        created_at -> BigInt,
    }
}

diesel::table! {
    Photo (photo_id) {
        photo_id -> BigInt,
        title -> Text,
        description -> Nullable<Text>,
        public_id -> Text,
        url -> Text,
        secure_url -> Text,
        original_filename -> Nullable<Text>,
        file_format -> Nullable<Text>,
        file_size -> Nullable<BigInt>,
        width -> Nullable<Integer>,
        height -> Nullable<Integer>,
        uploaded_at -> BigInt,
        collection_id -> Nullable<BigInt>,
    }
}

diesel::table! {
    PendingRemoteOp (op_id) {
        op_id -> BigInt,
        kind -> Integer,
        public_id -> Text,
        attempts -> Integer,
        last_error -> Nullable<Text>,
        created_at -> BigInt,
        generation -> Integer,
    }
}

diesel::joinable!(Photo -> Collection (collection_id));

diesel::allow_tables_to_appear_in_same_query!(Collection, Photo, PendingRemoteOp,);
