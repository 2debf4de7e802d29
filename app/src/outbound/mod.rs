pub mod bmp280;
pub mod oled;
