use colored::*;

use crate::config::Config;
use crate::utils::random::get_random_u128;

const MESSAGES: [(&str, Color); 8] = [
        ("The cube has stopped spinning. It was getting dizzy anyway.", Color::Red),
        ("Canvas detached. The viewport is empty once more.", Color::Magenta),
        ("Depth buffer cleared to 1.0 for the very last time.", Color::Yellow),
        ("Every normal now points towards the exit.", Color::Cyan),
        ("The camera at (0, 1.6, 3) has left the scene.", Color::Green),
        ("All GPU buffers were returned in good condition.", Color::Blue),
        ("Scene disposed. No frames were harmed.", Color::BrightRed),
        ("0.01 radians at a time, we got there.", Color::BrightYellow),
];

/// A random colored farewell, or an empty string when disabled.
pub fn get_exit_message(config: &Config) -> String
{
        if !config.show_exit_message
        {
                return String::new();
        }

        let choice = match get_random_u128(MESSAGES.len() as u128)
        {
                Ok(choice) => choice as usize,
                Err(err) =>
                {
                        log::debug!("No randomness available ({err}), using the first message");
                        0
                }
        };

        let (message, color) = MESSAGES[choice];

        message.color(color).to_string()
}
