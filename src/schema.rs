table! {
    local_storage (key) {
        key -> Text,
        value -> Text,
        revision -> BigInt,
    }
}

table! {
    account (id) {
        id -> Integer,
        clerk_id -> Text,
        email -> Text,
        username -> Nullable<Text>,
        photo -> Text,
        firstname -> Nullable<Text>,
        lastname -> Nullable<Text>,
        created -> Timestamp,
    }
}

allow_tables_to_appear_in_same_query!(
    local_storage,
    account,
);
