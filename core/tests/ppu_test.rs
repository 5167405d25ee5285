mod common;

use agate_core::prelude::*;
use common::setup;

const MAGENTA: u16 = 0x7C1F;
const RED: u16 = 0x001F;
const GREEN: u16 = 0x03E0;
const WHITE: u16 = 0x7FFF;

fn render_line0(gba: &mut Gba) {
    gba.bus.ppu.vcount = 0;
    gba.bus.render_scanline();
}

#[test]
fn test_mode3_direct_color_pixel() {
    let mut gba = setup();
    gba.bus.write16(0x0600_0000, MAGENTA);
    gba.bus.write16(0x0400_0000, 0x0403); // mode 3, BG2 enabled

    render_line0(&mut gba);
    assert_eq!(gba.framebuffer()[0], MAGENTA);
}

#[test]
fn test_backdrop_fills_when_nothing_enabled() {
    let mut gba = setup();
    gba.bus.write16(0x0500_0000, GREEN); // backdrop = palette entry 0
    gba.bus.write16(0x0400_0000, 0x0000);

    render_line0(&mut gba);
    for x in 0..SCREEN_WIDTH {
        assert_eq!(gba.framebuffer()[x], GREEN);
    }
}

#[test]
fn test_forced_blank_is_white() {
    let mut gba = setup();
    gba.bus.write16(0x0600_0000, MAGENTA);
    gba.bus.write16(0x0400_0000, 0x0483); // mode 3 + forced blank

    render_line0(&mut gba);
    for x in 0..SCREEN_WIDTH {
        assert_eq!(gba.framebuffer()[x], WHITE);
    }
}

#[test]
fn test_mode4_paletted_with_page_flip() {
    let mut gba = setup();
    gba.bus.write16(0x0500_0002, RED); // palette entry 1
    gba.bus.write16(0x0600_0000, 0x0101); // page 0: index 1 at x=0,1
    gba.bus.write16(0x0600_A000, 0x0000); // page 1: transparent
    gba.bus.write16(0x0500_0000, GREEN); // backdrop

    gba.bus.write16(0x0400_0000, 0x0404); // mode 4, BG2
    render_line0(&mut gba);
    assert_eq!(gba.framebuffer()[0], RED);

    // Flip to the second page: index 0 is transparent, backdrop shows.
    gba.bus.write16(0x0400_0000, 0x0414);
    render_line0(&mut gba);
    assert_eq!(gba.framebuffer()[0], GREEN);
}

#[test]
fn test_mode5_small_frame() {
    let mut gba = setup();
    gba.bus.write16(0x0500_0000, GREEN); // backdrop
    gba.bus.write16(0x0600_0000, MAGENTA);
    gba.bus.write16(0x0400_0000, 0x0405); // mode 5, BG2

    render_line0(&mut gba);
    assert_eq!(gba.framebuffer()[0], MAGENTA);
    // Mode 5 is 160 wide; beyond that the backdrop shows through.
    assert_eq!(gba.framebuffer()[200], GREEN);
}

/// Build a mode-0 scene: BG0 uses a solid 4bpp tile at the top-left map
/// slot. Char base 0, screen base block 8 (0x4000).
fn setup_mode0_bg0(gba: &mut Gba) {
    gba.bus.write16(0x0400_0000, 0x0100); // mode 0, BG0
    gba.bus.write16(0x0400_0008, 0x0800); // BG0CNT: screen base 8, char 0

    // Tile 1, 4bpp: every pixel uses color index 2.
    for i in 0..16 {
        gba.bus.write16(0x0600_0020 + i * 2, 0x2222);
    }
    // Map entry (0,0) = tile 1, palette 0.
    gba.bus.write16(0x0600_4000, 0x0001);
    // Palette entry 2 = red.
    gba.bus.write16(0x0500_0004, RED);
}

#[test]
fn test_mode0_tile_pixel() {
    let mut gba = setup();
    setup_mode0_bg0(&mut gba);

    render_line0(&mut gba);
    assert_eq!(gba.framebuffer()[0], RED);
    assert_eq!(gba.framebuffer()[7], RED);
    // The neighboring map entry is tile 0 (all transparent): backdrop.
    assert_eq!(gba.framebuffer()[8], 0x0000);
}

#[test]
fn test_mode0_scroll_wraps() {
    let mut gba = setup();
    setup_mode0_bg0(&mut gba);

    // Scroll right by 4: the tile's pixels shift left on screen.
    gba.bus.write16(0x0400_0010, 4);
    render_line0(&mut gba);
    assert_eq!(gba.framebuffer()[0], RED); // tile pixel 4
    assert_eq!(gba.framebuffer()[3], RED); // tile pixel 7
    assert_eq!(gba.framebuffer()[4], 0x0000); // past the tile
}

#[test]
fn test_priority_orders_layers() {
    let mut gba = setup();
    // BG0 (solid red tile) and BG1 (solid green tile) both cover x=0.
    gba.bus.write16(0x0400_0000, 0x0300); // mode 0, BG0+BG1
    gba.bus.write16(0x0400_0008, 0x0801); // BG0: screen base 8, priority 1
    gba.bus.write16(0x0400_000A, 0x1000); // BG1: screen base 16, priority 0

    for i in 0..16 {
        gba.bus.write16(0x0600_0020 + i * 2, 0x2222); // tile 1: index 2
        gba.bus.write16(0x0600_0040 + i * 2, 0x3333); // tile 2: index 3
    }
    gba.bus.write16(0x0600_4000, 0x0001); // BG0 map: tile 1
    gba.bus.write16(0x0600_8000, 0x0002); // BG1 map: tile 2
    gba.bus.write16(0x0500_0004, RED); // index 2
    gba.bus.write16(0x0500_0006, GREEN); // index 3

    render_line0(&mut gba);
    // BG1 has the lower priority value: it wins.
    assert_eq!(gba.framebuffer()[0], GREEN);

    // Swap priorities; now BG0 wins.
    gba.bus.write16(0x0400_0008, 0x0800);
    gba.bus.write16(0x0400_000A, 0x1001);
    render_line0(&mut gba);
    assert_eq!(gba.framebuffer()[0], RED);
}

#[test]
fn test_blend_mode0_is_identity() {
    let mut gba = setup();
    setup_mode0_bg0(&mut gba);
    // All targets selected but effect mode 0: nothing changes.
    gba.bus.write16(0x0400_0050, 0x3F3F);
    gba.bus.write16(0x0400_0052, 0x0808);

    render_line0(&mut gba);
    assert_eq!(gba.framebuffer()[0], RED);
}

#[test]
fn test_brighten_to_white() {
    let mut gba = setup();
    setup_mode0_bg0(&mut gba);
    // Mode 2 (brighten), BG0 as first target, EVY = 16.
    gba.bus.write16(0x0400_0050, 0x0081);
    gba.bus.write16(0x0400_0054, 16);

    render_line0(&mut gba);
    assert_eq!(gba.framebuffer()[0], WHITE);
}

#[test]
fn test_alpha_blend_against_backdrop() {
    let mut gba = setup();
    setup_mode0_bg0(&mut gba);
    gba.bus.write16(0x0500_0000, GREEN); // backdrop below the tile

    // Mode 1 alpha, first = BG0, second = backdrop, EVA = EVB = 8.
    gba.bus.write16(0x0400_0050, 0x2041);
    gba.bus.write16(0x0400_0052, 0x0808);

    render_line0(&mut gba);
    // Half red + half green per channel.
    assert_eq!(gba.framebuffer()[0], ((RED & 0x1F) / 2) | (((GREEN >> 5) & 0x1F) / 2) << 5);
}

#[test]
fn test_window_masks_layer() {
    let mut gba = setup();
    setup_mode0_bg0(&mut gba);
    gba.bus.write16(0x0500_0000, GREEN); // backdrop

    // WIN0 covers x 0..4, y 0..160; inside shows nothing, outside BG0.
    gba.bus.write16(0x0400_0000, 0x2100); // mode 0, BG0, WIN0 enable
    gba.bus.write16(0x0400_0040, 0x0004); // WIN0H: x1=0, x2=4
    gba.bus.write16(0x0400_0044, 0x00A0); // WIN0V: y1=0, y2=160
    gba.bus.write16(0x0400_0048, 0x0000); // WININ: nothing inside
    gba.bus.write16(0x0400_004A, 0x003F); // WINOUT: everything outside

    render_line0(&mut gba);
    assert_eq!(gba.framebuffer()[0], GREEN); // masked to backdrop
    assert_eq!(gba.framebuffer()[4], RED); // outside the window
}

#[test]
fn test_sprite_renders_over_backdrop() {
    let mut gba = setup();
    gba.bus.write16(0x0400_0000, 0x1000); // mode 0, OBJ enable, 2D mapping

    // OBJ tile 1 (at 0x10020): 4bpp, all pixels color 1.
    for i in 0..16 {
        gba.bus.write16(0x0601_0020 + i * 2, 0x1111);
    }
    // OAM entry 0: 8x8 sprite at (0, 0), tile 1, palette 0.
    gba.bus.write16(0x0700_0000, 0x0000);
    gba.bus.write16(0x0700_0002, 0x0000);
    gba.bus.write16(0x0700_0004, 0x0001);
    // OBJ palette entry 1.
    gba.bus.write16(0x0500_0202, MAGENTA);

    render_line0(&mut gba);
    assert_eq!(gba.framebuffer()[0], MAGENTA);
    assert_eq!(gba.framebuffer()[7], MAGENTA);
    assert_eq!(gba.framebuffer()[8], 0x0000);
}

#[test]
fn test_sprite_y_wraps_negative() {
    let mut gba = setup();
    gba.bus.write16(0x0400_0000, 0x1000);

    for i in 0..16 {
        gba.bus.write16(0x0601_0020 + i * 2, 0x1111);
    }
    // Y = 252 wraps to -4: rows 0..3 of the screen show rows 4..7.
    gba.bus.write16(0x0700_0000, 252);
    gba.bus.write16(0x0700_0002, 0x0000);
    gba.bus.write16(0x0700_0004, 0x0001);
    gba.bus.write16(0x0500_0202, MAGENTA);

    render_line0(&mut gba);
    assert_eq!(gba.framebuffer()[0], MAGENTA);

    // By line 4 the sprite has ended.
    gba.bus.ppu.vcount = 4;
    gba.bus.render_scanline();
    assert_eq!(gba.framebuffer()[4 * SCREEN_WIDTH], 0x0000);
}

#[test]
fn test_affine_background_identity_matrix() {
    let mut gba = setup();
    gba.bus.write16(0x0400_0000, 0x0400); // mode 2, BG2

    // BG2: 8bpp tiles, 16x16-tile map, char base 0, screen base 8.
    gba.bus.write16(0x0400_000C, 0x0800);

    // Tile 1: all pixels index 5. Affine map entries are bytes.
    for i in 0..32 {
        gba.bus.write16(0x0600_0040 + i * 2, 0x0505);
    }
    // Affine map entries are single bytes; a halfword write sets map slots
    // (0,0) = tile 1 and (0,1) = tile 0 without the byte-write duplication.
    gba.bus.write16(0x0600_4000, 0x0001);
    gba.bus.write16(0x0500_000A, RED); // palette entry 5

    // Identity matrix: PA = PD = 1.0 (8.8 fixed).
    gba.bus.write16(0x0400_0020, 0x0100);
    gba.bus.write16(0x0400_0026, 0x0100);

    render_line0(&mut gba);
    assert_eq!(gba.framebuffer()[0], RED);
    assert_eq!(gba.framebuffer()[7], RED);
    assert_eq!(gba.framebuffer()[8], 0x0000); // tile 0 beyond
}

#[test]
fn test_vcount_match_flag_and_gate() {
    let mut gba = setup();
    // Target line 5 with the match IRQ enabled.
    gba.bus.write16(0x0400_0004, 0x0520);

    gba.bus.ppu.vcount = 4;
    assert!(!gba.bus.ppu.vcount_match());
    gba.bus.ppu.vcount = 5;
    assert!(gba.bus.ppu.vcount_match());
    assert!(gba.bus.read16(0x0400_0004) & 0x0004 != 0); // match flag

    // Same line without the enable bit: flag sets, IRQ does not fire.
    gba.bus.write16(0x0400_0004, 0x0500);
    assert!(!gba.bus.ppu.vcount_match());
    assert!(gba.bus.read16(0x0400_0004) & 0x0004 != 0);
}
