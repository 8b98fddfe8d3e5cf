pub mod material_requests;
