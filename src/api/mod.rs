pub mod images;
pub mod items;
pub mod qr;
pub mod rentals;
pub mod returns;
pub mod students;

pub use images::ImagesApi;
pub use items::ItemsApi;
pub use qr::QrApi;
pub use rentals::RentalsApi;
pub use returns::ReturnsApi;
pub use students::StudentsApi;

use crate::http_client::ApiClient;

/// All endpoint groups wired over one shared client
#[derive(Clone)]
pub struct Api {
    pub qr: QrApi,
    pub items: ItemsApi,
    pub rentals: RentalsApi,
    pub returns: ReturnsApi,
    pub images: ImagesApi,
    pub students: StudentsApi,
}

impl Api {
    pub fn new(client: ApiClient) -> Self {
        Self {
            qr: QrApi::new(client.clone()),
            items: ItemsApi::new(client.clone()),
            rentals: RentalsApi::new(client.clone()),
            returns: ReturnsApi::new(client.clone()),
            images: ImagesApi::new(client.clone()),
            students: StudentsApi::new(client),
        }
    }
}
