fn main() {
   tauri_plugin::Builder::new(&["migrate_to_document_store", "health"]).build();
}
