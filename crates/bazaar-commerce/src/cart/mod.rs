//! Shopping cart and coupons.

mod cart;
mod coupon;

pub use cart::{AddToCart, Cart, CartItem, CartService, MAX_QUANTITY_PER_ITEM};
pub use coupon::{Coupon, CouponQuote, CouponService, DiscountType, NewCoupon};
