use tuma_core::identity::User;
use tuma_order::models::Order;

use crate::models::Payment;

/// Renders the payment receipt sent to the customer once a payment
/// completes. HTML so mail clients render it without an attachment
/// viewer; the engine also attaches it as a standalone file.
pub fn render(order: &Order, payment: &Payment, customer: &User) -> String {
    let distance = order
        .distance_km
        .map(|d| format!("{d:.1} km"))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "<html><body>\
         <h1>Tuma Payment Receipt</h1>\
         <p>Receipt No: {receipt_no}</p>\
         <p>Date: {date}</p>\
         <hr/>\
         <p>Customer: {customer}</p>\
         <p>Order: #{order_id}</p>\
         <p>Parcel: {parcel}</p>\
         <p>Route: {pickup} to {destination} ({distance})</p>\
         <hr/>\
         <p>Amount Paid: <b>KES {amount:.2}</b></p>\
         <p>Payment Method: {method}</p>\
         <p>Transaction Ref: {checkout}</p>\
         <p>Thank you for choosing Tuma.</p>\
         </body></html>",
        receipt_no = payment.id.simple(),
        date = payment.updated_at.format("%Y-%m-%d %H:%M UTC"),
        customer = customer.full_name,
        order_id = order.id.simple(),
        parcel = order.parcel_name,
        pickup = order.pickup_address,
        destination = order.destination_address,
        distance = distance,
        amount = payment.amount,
        method = payment.method,
        checkout = payment.checkout_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use tuma_core::identity::UserRole;
    use tuma_core::payment::CheckoutId;
    use tuma_order::models::{DeliveryCode, OrderStatus};
    use tuma_order::pricing::WeightCategory;

    #[test]
    fn receipt_carries_the_transaction_details() {
        let now = Utc::now();
        let customer = User {
            id: Uuid::new_v4(),
            full_name: "Amina Odhiambo".to_string(),
            email: "amina@example.com".to_string(),
            phone: Some("+254700000001".to_string()),
            role: UserRole::Customer,
            vehicle_type: None,
            plate_number: None,
            is_active: true,
            created_at: now,
        };
        let order = Order {
            id: Uuid::new_v4(),
            customer_id: customer.id,
            courier_id: None,
            parcel_name: "Books".to_string(),
            description: None,
            weight_kg: 2.0,
            weight_category: WeightCategory::Medium,
            pickup_address: "Pickup Lane 1".to_string(),
            pickup_coords: None,
            destination_address: "Destination Rd 9".to_string(),
            destination_coords: None,
            distance_km: Some(12.5),
            price: 12.50,
            status: OrderStatus::Pending,
            delivery_code: DeliveryCode::from_stored("042137"),
            parcel_image_url: None,
            current_location: None,
            created_at: now,
            updated_at: now,
            picked_up_at: None,
            delivered_at: None,
        };
        let payment = Payment::pending(order.id, 12.50, CheckoutId::new("ws_CO_1"));

        let html = render(&order, &payment, &customer);
        assert!(html.contains("Amina Odhiambo"));
        assert!(html.contains("KES 12.50"));
        assert!(html.contains("ws_CO_1"));
        assert!(html.contains("12.5 km"));
        // The delivery code never appears on a receipt.
        assert!(!html.contains("042137"));
    }
}
